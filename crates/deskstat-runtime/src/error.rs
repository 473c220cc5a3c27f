use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("pactl not found")]
    NotFound,
    #[error("pactl command failed: {0}")]
    CommandFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected pactl output: {0:?}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bus error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("connection closed by publisher")]
    Closed,
    #[error("another publisher is already running at {0}")]
    AlreadyRunning(String),
    #[error("invalid socket path: {0}")]
    InvalidSocketPath(String),
}
