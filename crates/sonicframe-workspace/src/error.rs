//! Workspace error types.

use thiserror::Error;

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("path escapes the sandbox: {0}")]
    OutsideSandbox(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
