//! Application state shared across handlers.

use std::sync::Arc;

use sonicframe_manager::{JobManager, PipelineConfig, RecoveryService};
use sonicframe_store::{EventLog, EventLogger, JobStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn JobStore>,
    pub events: Arc<dyn EventLog>,
    pub event_logger: EventLogger,
    pub manager: Arc<JobManager>,
    pub recovery: Arc<RecoveryService>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn JobStore>,
        events: Arc<dyn EventLog>,
        event_logger: EventLogger,
        senders: sonicframe_channels::PipelineSenders,
        pipeline_config: PipelineConfig,
    ) -> Self {
        let manager = Arc::new(JobManager::new(store.clone(), event_logger.clone(), senders.clone()));
        let recovery = RecoveryService::new(store.clone(), event_logger.clone(), senders, pipeline_config);
        Self { config, store, events, event_logger, manager, recovery }
    }
}
