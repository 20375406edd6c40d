use thiserror::Error;

/// Failure reported by a producer, or raised while applying its result.
///
/// `Cancelled` is never surfaced through `FetchState::error`; every other
/// variant is stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request cancelled")]
    Cancelled,
    #[error("{0}")]
    Failed(String),
    #[error("failed to decode payload: {0}")]
    Decode(String),
    #[error("executor unavailable: {0}")]
    Spawn(String),
}

impl FetchError {
    pub fn failed(message: impl Into<String>) -> Self {
        FetchError::Failed(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}

impl From<futures::task::SpawnError> for FetchError {
    fn from(e: futures::task::SpawnError) -> Self {
        FetchError::Spawn(e.to_string())
    }
}
