//! Errors raised while reading or writing host messages.

/// Why a host message could not be handled.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("Received an empty message")]
    Empty,

    #[error("Unknown message type '{0}'")]
    UnknownMessage(String),

    #[error("Unknown shape key command '{0}'")]
    UnknownCommand(String),

    #[error("Malformed message: {0}")]
    Decode(serde_json::Error),

    #[error("Failed to encode message: {0}")]
    Encode(serde_json::Error),
}
