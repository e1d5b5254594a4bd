//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in the bytes the server sent
//! (or the client tried to send), not in the network or the game phase.

/// Errors that can occur while encoding or decoding wire records.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields,
    /// or wrong data types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The record parsed, but its `type` is not one the client knows.
    ///
    /// Newer servers may add message types; the client drops these
    /// instead of failing.
    #[error("unknown message type: {0:?}")]
    UnknownType(String),

    /// The record parsed, but violates the protocol's shape rules
    /// (round 0, card number above 13, duplicate player names, ...).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
