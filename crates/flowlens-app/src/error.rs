use thiserror::Error;

/// Failure of a backend request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    /// The request was refused before reaching the backend.
    #[error("{0}")]
    InvalidRequest(String),

    /// Superseded by a newer request in the same slot, or aborted by teardown.
    #[error("Request canceled")]
    Canceled,
}

impl FetchError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, FetchError::Canceled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Backend {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}
