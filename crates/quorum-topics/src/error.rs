use quorum_core::FetchError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeskError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl DeskError {
    /// HTTP-style status code for the envelope boundary.
    pub fn status(&self) -> u16 {
        match self {
            DeskError::NotFound(_) => 404,
            DeskError::Conflict(_) => 409,
            DeskError::Invalid(_) => 400,
        }
    }
}

impl From<DeskError> for FetchError {
    fn from(e: DeskError) -> Self {
        FetchError::Failed(format!("{} {}", e.status(), e))
    }
}
