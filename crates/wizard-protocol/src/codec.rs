//! Codec trait, the JSON codec, and event classification.
//!
//! A "codec" (coder/decoder) converts between Rust values and raw frame
//! bytes. The rest of the client only depends on the [`Codec`] trait, so
//! the wire format can be swapped without touching the session logic.
//!
//! [`decode_event`] is the one entry point for inbound frames. It sorts bad
//! input into three buckets the caller can log differently:
//!
//! ```text
//! not JSON / wrong shape        → ProtocolError::Decode
//! JSON with an unknown "type"   → ProtocolError::UnknownType
//! parsed but breaks game rules  → ProtocolError::InvalidMessage
//! ```

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Event, ProtocolError};

/// A codec that can encode Rust values to bytes and decode bytes back.
///
/// - `Send + Sync + 'static`: the client runtime keeps its codec inside a
///   spawned Tokio task.
/// - `decode<T: DeserializeOwned>`: decoded values own their data, so the
///   frame buffer can be dropped right after decoding.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`). The Wizard server speaks
/// JSON text frames, so this is the codec the client uses by default.
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use wizard_protocol::{Action, Codec, JsonCodec};
///
/// let codec = JsonCodec;
///
/// let bytes = codec.encode(&Action::StartGame).unwrap();
/// assert_eq!(bytes, br#"{"action":"start_game"}"#);
///
/// let decoded: Action = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, Action::StartGame);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Event classification
// ---------------------------------------------------------------------------

/// Just the discriminant of an inbound record; every other field is
/// ignored at this stage.
#[derive(Deserialize)]
struct Discriminant {
    #[serde(rename = "type")]
    kind: String,
}

/// Decodes and validates one inbound frame.
///
/// The `type` field is read first so an unknown message type is reported
/// as such instead of as a generic parse failure.
///
/// # Errors
/// - `ProtocolError::Decode`: not a record, or `type` missing, or the
///   fields don't fit the event's shape
/// - `ProtocolError::UnknownType`: well-formed, but `type` is not one of
///   [`Event::KINDS`]
/// - `ProtocolError::InvalidMessage`: see [`Event::validate`]
pub fn decode_event<C: Codec>(
    codec: &C,
    data: &[u8],
) -> Result<Event, ProtocolError> {
    let Discriminant { kind } = codec.decode(data)?;
    if !Event::KINDS.contains(&kind.as_str()) {
        return Err(ProtocolError::UnknownType(kind));
    }

    let event: Event = codec.decode(data)?;
    event.validate()?;
    Ok(event)
}
