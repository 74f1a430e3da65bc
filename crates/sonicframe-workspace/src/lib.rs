//! Sandboxed scratch space for in-flight downloads/conversions/keyframes,
//! plus the periodic cleanup service that keeps it bounded.

pub mod cleanup;
pub mod error;
pub mod workspace;

pub use cleanup::{CleanupConfig, CleanupService};
pub use error::{WorkspaceError, WorkspaceResult};
pub use workspace::{TempWorkspace, WorkspaceStats};
