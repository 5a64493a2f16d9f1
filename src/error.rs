use geoguard::GuardError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Decoded `Error(string)` payload when a contract call reverted.
    pub fn revert_reason(&self) -> Option<String> {
        match self {
            CliError::Guard(e) => e.revert_reason(),
            _ => None,
        }
    }
}
