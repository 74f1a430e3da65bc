//! Axum HTTP API for the sonicframe conversion pipeline (spec §6): batch
//! submission, job/batch status polling, administrative recovery, and
//! diagnostics, plus the ambient health/metrics surface.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
