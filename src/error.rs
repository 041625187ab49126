use std::path::PathBuf;

use thiserror::Error;

/// Every failure a procedure can surface to the operator.
///
/// The first eight variants are the operator-facing taxonomy; the rest wrap
/// transport and decoding failures from the underlying services.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("No account matches {0}")]
    AccountNotFound(String),

    #[error("Invalid account identifier {0:?}: {1}")]
    InvalidIdentifier(String, String),

    #[error("Product {0} not found")]
    ProductNotFound(String),

    #[error("Invalid image index {index}. Product has {len} images.")]
    InvalidImageIndex { index: i64, len: usize },

    #[error("Failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Failed to upload {object}: {reason}")]
    UploadFailed { object: String, reason: String },

    #[error("Could not load credentials from {}: {reason}", path.display())]
    CredentialsMissing { path: PathBuf, reason: String },

    #[error("{0}")]
    Argument(String),

    #[error("Token exchange failed: {0}")]
    Auth(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response shape: {0}")]
    Decode(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AdminError>;

impl AdminError {
    /// The service-side error code (`USER_NOT_FOUND`, `NOT_FOUND`, ...) when
    /// this is a remote API error.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            AdminError::Api { message, .. } => message
                .split(|c: char| c == ' ' || c == ':')
                .next()
                .filter(|code| !code.is_empty()),
            _ => None,
        }
    }

    pub fn is_api_status(&self, code: u16) -> bool {
        matches!(self, AdminError::Api { status, .. } if *status == code)
    }
}
