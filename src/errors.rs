use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invalid cookie attribute: {0}")]
    InvalidAttribute(String),

    #[error("Invalid secret: a non-empty secret is required")]
    InvalidSecret,

    #[error("Session store unavailable: {0}")]
    StoreUnavailable(#[source] anyhow::Error),

    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Reserved session key: {0}")]
    ReservedKey(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    /// Wraps an arbitrary backend failure as [`SessionError::StoreUnavailable`].
    pub fn store<E: Into<anyhow::Error>>(err: E) -> Self {
        SessionError::StoreUnavailable(err.into())
    }

    pub(crate) fn attribute(msg: impl Into<String>) -> Self {
        SessionError::InvalidAttribute(msg.into())
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
