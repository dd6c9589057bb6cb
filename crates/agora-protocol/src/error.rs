//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding hub messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or
    /// truncated frames.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message passed deserialization but violates protocol rules —
    /// e.g., an event frame with an empty event name.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
