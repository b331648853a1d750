use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenOrError {
    /// The receiving process simulates a Byzantine fault.
    #[error("process is faulty")]
    FaultyRejection,

    /// The receiving process has been stopped.
    #[error("process is stopped")]
    StoppedRejection,

    #[error("Malformed vote: {0}")]
    MalformedVote(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BenOrError {
    /// Rejections are the expected answer of faulty or stopped processes,
    /// not transport failures.
    pub fn is_rejection(&self) -> bool {
        matches!(self, BenOrError::FaultyRejection | BenOrError::StoppedRejection)
    }
}

pub type Result<T> = std::result::Result<T, BenOrError>;
