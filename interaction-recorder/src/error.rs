use thiserror::Error;

use crate::tree::NodeId;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Malformed event target: {0}")]
    MalformedTarget(String),

    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),

    #[error("Unknown node reference: {0}")]
    UnknownRef(String),

    #[error("Invalid tree operation: {0}")]
    InvalidTreeOperation(String),

    #[error("Invalid marker: {0}")]
    InvalidMarker(String),

    #[error("Invalid log line: {0}")]
    InvalidLine(String),

    #[error("Unknown interaction kind: {0}")]
    UnknownKind(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to save session: {0}")]
    SaveError(String),
}

pub type Result<T> = std::result::Result<T, RecorderError>;
