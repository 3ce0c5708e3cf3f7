use thiserror::Error;

#[derive(Error, Debug)]
pub enum LastGreenError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{operation} failed: {message}")]
    Retrieval { operation: String, message: String },
}

impl LastGreenError {
    pub fn retrieval(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Retrieval {
            operation: operation.into(),
            message: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LastGreenError>;
