use thiserror::Error;

pub type TelemetryResult<T> = Result<T, TelemetryError>;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install the logger: {0}")]
    LoggerError(#[from] log::SetLoggerError),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl TelemetryError {
    pub fn internal(message: impl Into<String>) -> Self {
        TelemetryError::InternalError(message.into())
    }
}
