//! Unified error type for the Wizard client.

use wizard_protocol::ProtocolError;
use wizard_session::GuardViolation;
use wizard_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Callers of [`ClientHandle`](crate::ClientHandle) deal with this single
/// type. The `#[from]` attribute on each variant generates the `From`
/// impl, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (not connected, link stopped, ...).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode failed).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The action failed a local check; nothing was sent.
    #[error("rejected: {0}")]
    Rejected(#[from] GuardViolation),

    /// The client runtime is no longer running.
    #[error("client has stopped")]
    Stopped,
}

impl ClientError {
    /// The guard violation, if this is a local rejection.
    pub fn violation(&self) -> Option<&GuardViolation> {
        match self {
            Self::Rejected(v) => Some(v),
            _ => None,
        }
    }
}
