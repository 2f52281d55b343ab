use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A request field failed validation. `message` is safe to return to clients.
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Invalid lastEvaluatedKey format")]
    InvalidCursor,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }

    /// Name of the offending request field, for client errors
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Error::Validation { field, .. } => Some(field),
            Error::InvalidCursor => Some("lastEvaluatedKey"),
            _ => None,
        }
    }

    /// Whether the caller is at fault (400) rather than the backend (500)
    pub fn is_client_error(&self) -> bool {
        self.field().is_some()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
