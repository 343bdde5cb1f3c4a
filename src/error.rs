use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchoolMatchError {
    /// Required input was not provided before a request could be built.
    #[error("{0}")]
    MissingInput(String),

    /// Upstream service answered with a non-success status.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter '{id}': {reason}")]
    InvalidParameter { id: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SchoolMatchError {
    pub fn invalid_parameter(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Message shown to the user in an error notice.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingInput(msg) => msg.clone(),
            Self::Upstream { message, .. } => message.clone(),
            Self::Http(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchoolMatchError>;
