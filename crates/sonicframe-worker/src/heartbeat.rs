//! Heartbeat helper for long stage operations (spec §4.3: "~60s cadence").
//!
//! Spawns a background task that periodically stamps `LastAttemptAt` so
//! the Recovery service's stale-job scan doesn't reclaim a job that is
//! still actively being worked on. Callers abort the returned handle once
//! their stage operation finishes.

use std::sync::Arc;
use std::time::Duration;

use sonicframe_models::JobId;
use sonicframe_store::JobStore;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

pub struct HeartbeatGuard {
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn spawn_heartbeat(store: Arc<dyn JobStore>, job_id: JobId) -> HeartbeatGuard {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            if let Ok(mut job) = store.get_job_by_id(&job_id).await {
                job.heartbeat();
                let _ = store.update_job(job).await;
            }
        }
    });
    HeartbeatGuard { handle }
}
