//! Error types for the protocol layer.
//!
//! Each crate in flagquiz defines its own error enum. When you see a
//! `ProtocolError`, the problem is in the shape of a message, not in the
//! network or in room bookkeeping.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or a
    /// number where a string was expected.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but breaks a protocol rule, e.g. a username
    /// outside the allowed length.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
