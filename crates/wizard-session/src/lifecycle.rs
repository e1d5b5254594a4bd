//! Where the client stands in a game session.

use std::fmt;

/// The session lifecycle, as seen by the client.
///
/// ```text
///                 connect      Joined       state         state(game_over)
/// Disconnected ──────────→ AwaitingJoin ──→ Joined ──→ Running ─────────→ GameOver
///      ↑                                                  ↑                  │
///      │ fresh connect (view reset)                       └──── state ───────┘
///    (any)                                                     (new game)
/// ```
///
/// Losing the transport does *not* move the lifecycle; only a fresh,
/// explicit connect goes back to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    /// No session yet (or a fresh one was requested).
    #[default]
    Disconnected,
    /// Connected; waiting for the server to confirm our name.
    AwaitingJoin,
    /// In the lobby; no round has been dealt yet.
    Joined,
    /// A game is in progress.
    Running,
    /// The last game ended. A new one may start.
    GameOver,
}

impl Lifecycle {
    /// Returns `true` once the server has accepted our join.
    pub fn has_joined(&self) -> bool {
        matches!(self, Self::Joined | Self::Running | Self::GameOver)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::AwaitingJoin => "awaiting join",
            Self::Joined => "joined",
            Self::Running => "running",
            Self::GameOver => "game over",
        };
        f.write_str(s)
    }
}
