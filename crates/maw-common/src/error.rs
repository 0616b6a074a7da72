use thiserror::Error;

pub type CommonResult<T> = Result<T, CommonError>;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("failed to load configuration: {0}")]
    ConfigError(Box<figment::Error>),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CommonError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CommonError::InvalidArgument(message.into())
    }
}

impl From<figment::Error> for CommonError {
    fn from(error: figment::Error) -> Self {
        CommonError::ConfigError(Box::new(error))
    }
}
