//! Error types for the session layer.

use wizard_protocol::CardFace;

use crate::Lifecycle;

/// Why a local action was refused before anything was sent.
///
/// These are the client's own checks; the server still has the final say
/// and reports its objections as `error` events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardViolation {
    /// The name is empty once surrounding whitespace is removed.
    #[error("name must not be empty")]
    EmptyName,

    /// The action is not available in the current lifecycle state.
    #[error("cannot {action} while {lifecycle}")]
    WrongPhase {
        action: &'static str,
        lifecycle: Lifecycle,
    },

    /// Somebody else (or nobody) has the turn.
    #[error("it is not your turn")]
    NotYourTurn,

    /// Cards can't be played while announcements are being collected.
    #[error("announcements are still being collected")]
    AnnouncingPhase,

    /// Announcements are only taken at the start of a round.
    #[error("announcements are closed")]
    NotAnnouncingPhase,

    /// More tricks announced than there are cards in the round.
    #[error("cannot announce {count} tricks in round {round}")]
    AnnouncementTooHigh { count: u32, round: u32 },

    /// The card is not in the local hand.
    #[error("{0} is not in your hand")]
    CardNotInHand(CardFace),

    /// Only the designated player picks the trump color.
    #[error("you are not choosing trump")]
    NotTrumpChooser,

    /// Starting and kicking are reserved for the game's creator.
    #[error("only the creator can {0}")]
    NotCreator(&'static str),

    /// `kick` was called without any (non-blank) name.
    #[error("no players to kick")]
    NoKickTargets,

    /// `rejoin` needs a name from an earlier `join`.
    #[error("no name has been submitted yet")]
    NoNameSubmitted,
}
