use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("Invalid field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Invalid state: {0}")]
    State(String),

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound { what: what.into() }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
