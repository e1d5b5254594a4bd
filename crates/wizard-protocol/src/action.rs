//! Outbound actions: everything the client can ask the server to do.

use serde::{Deserialize, Serialize};

use crate::types::{CardFace, Color};

/// One request to the server. Each action is sent as its own flat JSON
/// object; the server never sees batches.
///
/// `#[serde(tag = "action", rename_all = "snake_case")]` puts the variant
/// name into the object's `action` field:
///
/// ```text
/// Action::StartGame                  → {"action":"start_game"}
/// Action::Announce { announcement }  → {"action":"announce","announcement":2}
/// Action::PlayCard { card: Fool }    → {"action":"play_card","type":"fool"}
/// ```
///
/// The server replies (eventually) with [`Event`](crate::Event)s; there is
/// no per-action response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Join the game under `name`.
    Join { name: String },

    /// Play a card from the hand. Only the face travels; the server knows
    /// who is playing it.
    PlayCard {
        #[serde(flatten)]
        card: CardFace,
    },

    /// Announce how many tricks this player expects to win.
    Announce { announcement: u32 },

    /// Pick the trump color after a wizard was turned up.
    ChooseTrump { color: Color },

    /// Start (or restart) the game. Creator only.
    StartGame,

    /// Remove a player from the game. Creator only.
    Kick { user: String },
}

impl Action {
    /// The wire name of this action.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::PlayCard { .. } => "play_card",
            Self::Announce { .. } => "announce",
            Self::ChooseTrump { .. } => "choose_trump",
            Self::StartGame => "start_game",
            Self::Kick { .. } => "kick",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_json(action: &Action) -> serde_json::Value {
        serde_json::to_value(action).unwrap()
    }

    #[test]
    fn test_action_join_json_format() {
        let action = Action::Join { name: "ada".into() };
        assert_eq!(to_json(&action), json!({"action": "join", "name": "ada"}));
    }

    #[test]
    fn test_action_play_number_card_is_flat() {
        let action = Action::PlayCard {
            card: CardFace::Number { color: Color::Green, number: 11 },
        };
        assert_eq!(
            to_json(&action),
            json!({"action": "play_card", "type": "number", "color": "green", "number": 11})
        );
    }

    #[test]
    fn test_action_play_wizard_has_no_color_or_number() {
        let action = Action::PlayCard { card: CardFace::Wizard };
        assert_eq!(to_json(&action), json!({"action": "play_card", "type": "wizard"}));
    }

    #[test]
    fn test_action_announce_json_format() {
        let action = Action::Announce { announcement: 0 };
        assert_eq!(
            to_json(&action),
            json!({"action": "announce", "announcement": 0})
        );
    }

    #[test]
    fn test_action_choose_trump_json_format() {
        let action = Action::ChooseTrump { color: Color::Yellow };
        assert_eq!(
            to_json(&action),
            json!({"action": "choose_trump", "color": "yellow"})
        );
    }

    #[test]
    fn test_action_start_game_json_format() {
        assert_eq!(to_json(&Action::StartGame), json!({"action": "start_game"}));
    }

    #[test]
    fn test_action_kick_json_format() {
        let action = Action::Kick { user: "mallory".into() };
        assert_eq!(to_json(&action), json!({"action": "kick", "user": "mallory"}));
    }

    #[test]
    fn test_action_name_matches_wire_tag() {
        let actions = [
            Action::Join { name: "a".into() },
            Action::PlayCard { card: CardFace::Fool },
            Action::Announce { announcement: 1 },
            Action::ChooseTrump { color: Color::Red },
            Action::StartGame,
            Action::Kick { user: "b".into() },
        ];
        for action in actions {
            assert_eq!(to_json(&action)["action"], json!(action.name()));
        }
    }
}
