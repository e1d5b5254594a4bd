//! Inbound events: everything the server pushes to the client.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::types::{CardFace, Player, Rights, RoundState};

/// One server message, discriminated by its `type` field.
///
/// The server sends these whenever it likes; none of them answers a
/// specific action. `StateUpdate` and `RosterUpdate` are complete
/// snapshots that replace whatever the client held before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The server accepted our `join`.
    #[serde(rename = "joined")]
    Joined,

    /// The full round state as seen by this client.
    #[serde(rename = "state")]
    StateUpdate(RoundState),

    /// The full roster, in seating order.
    #[serde(rename = "player")]
    RosterUpdate { players: Vec<Player> },

    /// What this client is allowed to do.
    #[serde(rename = "rights")]
    RightsUpdate { status: Rights },

    /// Free-text information for the message log.
    #[serde(rename = "message")]
    Info { msg: String },

    /// Free-text error for the message log. Never ends the session.
    #[serde(rename = "error")]
    Error { msg: String },

    /// Players the game is waiting for (e.g. after a disconnect).
    #[serde(rename = "management")]
    ManagementUpdate { waiting_for: Vec<String> },
}

impl Event {
    /// Every `type` value the client understands.
    pub const KINDS: [&'static str; 7] = [
        "joined",
        "state",
        "player",
        "rights",
        "message",
        "error",
        "management",
    ];

    /// The wire `type` of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Joined => "joined",
            Self::StateUpdate(_) => "state",
            Self::RosterUpdate { .. } => "player",
            Self::RightsUpdate { .. } => "rights",
            Self::Info { .. } => "message",
            Self::Error { .. } => "error",
            Self::ManagementUpdate { .. } => "management",
        }
    }

    /// Checks the rules serde can't express.
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidMessage` if:
    /// - a round number is 0
    /// - a card number is above 13
    /// - two roster entries share a name
    /// - more than one roster entry has the turn
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::StateUpdate(state) => validate_round(state),
            Self::RosterUpdate { players } => validate_roster(players),
            Self::Joined
            | Self::RightsUpdate { .. }
            | Self::Info { .. }
            | Self::Error { .. }
            | Self::ManagementUpdate { .. } => Ok(()),
        }
    }
}

fn validate_round(state: &RoundState) -> Result<(), ProtocolError> {
    if state.round_number == 0 {
        return Err(ProtocolError::InvalidMessage(
            "round number must be at least 1".into(),
        ));
    }
    for card in state.cards() {
        match card.face {
            CardFace::Number { number, .. } if number > CardFace::MAX_NUMBER => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "card number {number} exceeds {}",
                    CardFace::MAX_NUMBER
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_roster(players: &[Player]) -> Result<(), ProtocolError> {
    let mut seen = HashSet::with_capacity(players.len());
    for player in players {
        if !seen.insert(player.name.as_str()) {
            return Err(ProtocolError::InvalidMessage(format!(
                "duplicate player name {:?}",
                player.name
            )));
        }
    }

    let on_turn = players.iter().filter(|p| p.has_turn).count();
    if on_turn > 1 {
        return Err(ProtocolError::InvalidMessage(format!(
            "{on_turn} players have the turn"
        )));
    }
    Ok(())
}
