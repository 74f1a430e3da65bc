//! Manager-level error types.

use thiserror::Error;

pub type ManagerResult<T> = Result<T, ManagerError>;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("batch must contain between 1 and {max} urls, got {actual}")]
    InvalidBatchSize { actual: usize, max: usize },

    #[error(transparent)]
    Store(#[from] sonicframe_store::StoreError),
}
