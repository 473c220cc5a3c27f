use thiserror::Error;

#[derive(Debug, Error)]
pub enum MprisError {
    #[error("bus error: {0}")]
    Bus(#[from] zbus::Error),
    #[error("bus call failed: {0}")]
    Fdo(#[from] zbus::fdo::Error),
    #[error("session {0} did not answer")]
    Unreachable(String),
    #[error("session {0} timed out")]
    Timeout(String),
}
