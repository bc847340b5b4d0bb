//! Error types for envelope decoding.

/// Errors produced while decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tag {tag:?} is only valid on Console envelopes, got {msg_type:?}")]
    UnexpectedTag {
        msg_type: crate::MessageType,
        tag: crate::ConsoleTag,
    },
}
