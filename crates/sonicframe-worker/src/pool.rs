//! Bounded-concurrency worker pool: N tasks competing for one stage
//! channel, each running the stage's handler for one message at a time.
//!
//! Grounded on the teacher's `JobExecutor` (`vclip-worker/src/executor.rs`),
//! which gates concurrent job processing behind a `tokio::sync::Semaphore`
//! sized from `WorkerConfig`. Spec §5 calls for "a fixed pool of worker
//! threads" per stage competing for that stage's channel — the semaphore
//! there is implicit in spawning exactly `concurrency` long-lived tasks
//! rather than gating ad-hoc spawns, since each task's whole loop is one
//! permit's worth of concurrency for its lifetime.

use std::future::Future;
use std::sync::Arc;

use sonicframe_channels::StageReceiver;

/// Spawns `concurrency` tasks, each looping `receiver.recv()` and handing
/// the message to `handler`. Returns once all workers have been spawned;
/// the workers themselves run until the channel closes.
pub fn spawn_pool<T, H, Fut>(concurrency: usize, receiver: StageReceiver<T>, handler: Arc<H>)
where
    T: Send + 'static,
    H: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    for _ in 0..concurrency.max(1) {
        let receiver = receiver.clone();
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                handler(message).await;
            }
        });
    }
}
