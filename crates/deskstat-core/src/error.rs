use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("unknown widget style: {0}")]
    UnknownStyle(String),
    #[error("unknown border: {0}")]
    UnknownBorder(String),
    #[error("{option} must be between 0 and {max}, got {value}")]
    OutOfRange {
        option: &'static str,
        value: usize,
        max: usize,
    },
    #[error("no renderable tag among {0:?}")]
    NoRenderableTag(Vec<String>),
}
