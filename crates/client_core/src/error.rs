//! Error taxonomy for portal components and the upstream transport.

use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again later.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong";

/// Failure talking to the upstream collaborator, before any component has
/// decided what it means for the user.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("transport failure: {0}")]
    Network(String),
    #[error("upstream rejected request with status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
    },
    #[error("upstream returned an unreadable body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Server-supplied text, if the failure body carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            TransportError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            TransportError::Decode(value.to_string())
        } else {
            TransportError::Network(value.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Auth,
    Network,
    Server,
}

/// Error surfaced at a component boundary. Every variant carries the exact
/// text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortalError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Network(String),
    #[error("{message}")]
    Server { status: Option<u16>, message: String },
}

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        PortalError::Validation(message.into())
    }

    /// Maps a failed credential submission: rejections become `Auth` with the
    /// server text verbatim, transport failures the generic network text.
    pub fn auth(err: TransportError, fallback: &str) -> Self {
        match err {
            TransportError::Network(_) => PortalError::Network(NETWORK_ERROR_MESSAGE.to_string()),
            TransportError::Rejected { message, .. } => {
                PortalError::Auth(message.unwrap_or_else(|| fallback.to_string()))
            }
            TransportError::Decode(_) => PortalError::Auth(fallback.to_string()),
        }
    }

    /// Maps a failed data fetch or mutation.
    pub fn server(err: TransportError, fallback: &str) -> Self {
        match err {
            TransportError::Network(_) => PortalError::Network(NETWORK_ERROR_MESSAGE.to_string()),
            TransportError::Rejected { status, message } => PortalError::Server {
                status: Some(status),
                message: message.unwrap_or_else(|| fallback.to_string()),
            },
            TransportError::Decode(_) => PortalError::Server {
                status: None,
                message: fallback.to_string(),
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PortalError::Validation(_) => ErrorCategory::Validation,
            PortalError::Auth(_) => ErrorCategory::Auth,
            PortalError::Network(_) => ErrorCategory::Network,
            PortalError::Server { .. } => ErrorCategory::Server,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PortalError::Validation(message)
            | PortalError::Auth(message)
            | PortalError::Network(message)
            | PortalError::Server { message, .. } => message,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionFileError {
    #[error("failed to access session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}
