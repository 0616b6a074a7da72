use maw_common::error::CommonError;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

pub type ExecutionResult<T> = Result<T, ExecutionError>;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("error in common: {0}")]
    CommonError(#[from] CommonError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("transport error: {0}")]
    TransportError(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl<T> From<mpsc::error::SendError<T>> for ExecutionError {
    fn from(error: mpsc::error::SendError<T>) -> Self {
        ExecutionError::InternalError(error.to_string())
    }
}

impl From<oneshot::error::RecvError> for ExecutionError {
    fn from(error: oneshot::error::RecvError) -> Self {
        ExecutionError::InternalError(error.to_string())
    }
}
