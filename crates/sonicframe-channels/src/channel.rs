//! Multi-consumer wrapper over an unbounded mpsc channel.
//!
//! `tokio::sync::mpsc` gives one receiver; a stage pool has N≥1 worker
//! tasks competing for the same queue (spec §4.2). Wrapping the receiver
//! in a mutex lets every worker hold a clone of `StageChannel` and call
//! `recv` from its own loop — only one worker's `recv` actually resolves
//! per message, which is exactly the competing-consumers semantics the
//! spec asks for. Capacity is unbounded; backpressure comes from the
//! bounded number of workers draining the queue, not from the channel.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

pub struct StageSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for StageSender<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> StageSender<T> {
    /// Enqueues a message. Errors only if every receiver has been dropped,
    /// which in this process means the stage's worker pool has shut down.
    pub fn send(&self, message: T) -> Result<(), mpsc::error::SendError<T>> {
        self.tx.send(message)
    }
}

#[derive(Clone)]
pub struct StageReceiver<T> {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
}

impl<T> StageReceiver<T> {
    /// Awaits the next message. Returns `None` once the channel is closed
    /// and drained, signalling the worker loop to exit.
    pub async fn recv(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}

pub fn stage_channel<T>() -> (StageSender<T>, StageReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StageSender { tx }, StageReceiver { rx: Arc::new(Mutex::new(rx)) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn each_message_is_delivered_to_exactly_one_worker() {
        let (tx, rx) = stage_channel::<u32>();
        for i in 0..20u32 {
            tx.send(i).unwrap();
        }
        drop(tx);

        let counter = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let rx = rx.clone();
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                while let Some(_msg) = rx.recv().await {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }
}
