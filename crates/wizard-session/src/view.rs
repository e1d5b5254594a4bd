//! The view model: what the client currently believes about the game.
//!
//! A [`SessionView`] is plain data. The [`SessionMachine`](crate::SessionMachine)
//! is the only code that changes one; renderers receive shared snapshots
//! and read them through the getters and projections below.

use std::cmp::Reverse;

use wizard_protocol::{Card, Player, RoundState};

use crate::Lifecycle;

/// Whether a log line is informational or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Info,
    Error,
}

/// One line of the session's message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl SessionMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

/// Everything the client knows about its game session.
///
/// Fields are private: only the state machine writes them, and everything
/// else reads through accessors. Projections (`has_turn`, `scoreboard`,
/// ...) are computed on every call and never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) local_player_name: Option<String>,
    pub(crate) name_confirmed: bool,
    pub(crate) is_creator: bool,
    pub(crate) roster: Vec<Player>,
    pub(crate) round: Option<RoundState>,
    pub(crate) waiting_for: Vec<String>,
    pub(crate) messages: Vec<SessionMessage>,
    pub(crate) revision: u64,
}

impl SessionView {
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// The name submitted with `join`, confirmed or not.
    pub fn local_player_name(&self) -> Option<&str> {
        self.local_player_name.as_deref()
    }

    /// `true` once the server answered our `join` with `joined`.
    pub fn is_name_confirmed(&self) -> bool {
        self.name_confirmed
    }

    pub fn is_creator(&self) -> bool {
        self.is_creator
    }

    /// Players in the order the server lists them.
    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    /// The current round, once the first one has been dealt.
    pub fn round(&self) -> Option<&RoundState> {
        self.round.as_ref()
    }

    /// Players the server is waiting for. Empty when nobody is missing.
    pub fn waiting_for(&self) -> &[String] {
        &self.waiting_for
    }

    /// The message log, oldest first.
    pub fn messages(&self) -> &[SessionMessage] {
        &self.messages
    }

    /// Number of changes applied so far. Increases by one per change, so a
    /// subscriber that skipped snapshots can tell how many it missed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Our own roster entry, if the roster lists us.
    pub fn local_player(&self) -> Option<&Player> {
        let name = self.local_player_name.as_deref()?;
        self.player(name)
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.roster.iter().find(|p| p.name == name)
    }

    /// The player whose turn it is.
    pub fn current_player(&self) -> Option<&Player> {
        self.roster.iter().find(|p| p.has_turn)
    }

    /// Our own hand, empty before the first round.
    pub fn hand(&self) -> &[Card] {
        self.round
            .as_ref()
            .map(|r| r.hand_cards.as_slice())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------
    // Projections
    // -----------------------------------------------------------------

    /// `true` if the roster says it is the local player's turn.
    pub fn has_turn(&self) -> bool {
        self.local_player().is_some_and(|p| p.has_turn)
    }

    /// `true` if the local player has to pick the trump color.
    pub fn is_trump_chooser(&self) -> bool {
        match (&self.round, &self.local_player_name) {
            (Some(round), Some(name)) => {
                round.trump_chooser.as_deref() == Some(name.as_str())
            }
            _ => false,
        }
    }

    /// `true` while announcements are being collected.
    pub fn is_announcing(&self) -> bool {
        self.round.as_ref().is_some_and(|r| r.is_announcing_phase)
    }

    /// Sum of all announcements made so far this round.
    pub fn announced_total(&self) -> u32 {
        self.roster.iter().filter_map(|p| p.announcement).sum()
    }

    /// The roster ordered by score, best first. Ties keep roster order.
    pub fn scoreboard(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.roster.iter().collect();
        players.sort_by_key(|p| Reverse(p.score));
        players
    }

    /// The winners of a finished game.
    ///
    /// Uses the server's list when it sent one; otherwise everybody tied
    /// for the highest score. Only meaningful in [`Lifecycle::GameOver`].
    pub fn winners(&self) -> Vec<&str> {
        if let Some(round) = &self.round {
            if !round.winners.is_empty() {
                return round.winners.iter().map(String::as_str).collect();
            }
        }

        let Some(best) = self.roster.iter().map(|p| p.score).max() else {
            return Vec::new();
        };
        self.roster
            .iter()
            .filter(|p| p.score == best)
            .map(|p| p.name.as_str())
            .collect()
    }
}
