//! Records that travel inside Wizard messages.
//!
//! The server is written against loose JSON objects; these types give each
//! object a fixed shape so the rest of the client can match on it instead
//! of poking at fields. Field names in Rust follow Rust conventions, and
//! `#[serde(rename = ...)]` maps them to the names used on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// One of the four suits.
///
/// `#[serde(rename_all = "lowercase")]` makes `Color::Red` travel as
/// `"red"`, which is what the server expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Yellow,
    Green,
    Blue,
}

impl Color {
    /// Every suit, in the order the server deals them.
    pub const ALL: [Color; 4] =
        [Color::Red, Color::Yellow, Color::Green, Color::Blue];

    /// The wire name of this color.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ProtocolError::InvalidMessage(format!("unknown color: {s:?}"))
            })
    }
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// What a card is, independent of who played it.
///
/// Only number cards carry a color and a value, so the face is a sum type
/// instead of a struct with optional fields: a "wizard with a color" cannot
/// be represented at all.
///
/// `#[serde(tag = "type")]` stores the variant name inside the object:
///
/// ```text
/// CardFace::Wizard                              → {"type":"wizard"}
/// CardFace::Number { color: Red, number: 7 }    → {"type":"number","color":"red","number":7}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CardFace {
    /// Always wins the trick (the first one played does).
    Wizard,
    /// Always loses the trick.
    Fool,
    /// A colored card worth `1..=13`.
    ///
    /// A trump color picked after a wizard is turned up arrives as a
    /// number card with value `0`.
    Number { color: Color, number: u8 },
}

impl CardFace {
    /// Highest value a number card can have.
    pub const MAX_NUMBER: u8 = 13;

    /// The suit, for number cards.
    pub fn color(&self) -> Option<Color> {
        match self {
            Self::Number { color, .. } => Some(*color),
            Self::Wizard | Self::Fool => None,
        }
    }

    /// The value, for number cards.
    pub fn number(&self) -> Option<u8> {
        match self {
            Self::Number { number, .. } => Some(*number),
            Self::Wizard | Self::Fool => None,
        }
    }
}

impl fmt::Display for CardFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wizard => f.write_str("wizard"),
            Self::Fool => f.write_str("fool"),
            Self::Number { color, number } => write!(f, "{color} {number}"),
        }
    }
}

/// A card as the server reports it.
///
/// Cards on the table name the player who put them there (`owner`). Cards
/// in a hand never do.
///
/// `#[serde(flatten)]` inlines the face's fields, so the wire object stays
/// flat: `{"type":"number","color":"blue","number":3,"owner":"ada"}`. The
/// server also sends an `id` per card; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    #[serde(flatten)]
    pub face: CardFace,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Card {
    /// A card with no owner.
    pub fn new(face: CardFace) -> Self {
        Self { face, owner: None }
    }

    pub fn wizard() -> Self {
        Self::new(CardFace::Wizard)
    }

    pub fn fool() -> Self {
        Self::new(CardFace::Fool)
    }

    pub fn number(color: Color, number: u8) -> Self {
        Self::new(CardFace::Number { color, number })
    }

    /// Returns the same card attributed to `owner`.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Returns the same card with any owner removed.
    #[must_use]
    pub fn without_owner(mut self) -> Self {
        self.owner = None;
        self
    }
}

impl From<CardFace> for Card {
    fn from(face: CardFace) -> Self {
        Self::new(face)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{} ({owner})", self.face),
            None => write!(f, "{}", self.face),
        }
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One roster entry.
///
/// The server marks "not announced yet" as `-1`. In Rust that is
/// `announcement: None`; the `announcement` serde module below does the
/// translation in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,

    #[serde(with = "announcement")]
    pub announcement: Option<u32>,

    #[serde(rename = "tricks")]
    pub tricks_won: u32,

    pub score: i32,

    #[serde(rename = "turn")]
    pub has_turn: bool,
}

impl Player {
    /// A player at the start of a game: nothing announced, no tricks,
    /// no score, not on turn.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            announcement: None,
            tricks_won: 0,
            score: 0,
            has_turn: false,
        }
    }
}

/// `-1` (or `null`) on the wire ⇔ `None` in Rust.
mod announcement {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<u32>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) => serializer.serialize_i64(i64::from(*n)),
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u32>, D::Error> {
        match Option::<i64>::deserialize(deserializer)? {
            None | Some(-1) => Ok(None),
            Some(n) => u32::try_from(n).map(Some).map_err(|_| {
                D::Error::custom(format!("announcement out of range: {n}"))
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Round state
// ---------------------------------------------------------------------------

/// Everything the server tells one client about the current round.
///
/// Each `state` message carries a complete `RoundState`; the client never
/// patches one, it replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundState {
    /// Cards played into the current trick, in play order.
    #[serde(rename = "table")]
    pub table_cards: Vec<Card>,

    /// The turned-up trump card, if any.
    #[serde(rename = "trump")]
    pub trump_card: Option<Card>,

    /// This client's own hand. Other hands are never sent.
    #[serde(rename = "hand")]
    pub hand_cards: Vec<Card>,

    /// 1-based; also the number of cards dealt this round.
    #[serde(rename = "round")]
    pub round_number: u32,

    #[serde(rename = "announcing")]
    pub is_announcing_phase: bool,

    /// The player who has to pick a trump color, if one must be picked.
    #[serde(rename = "choosing_trump")]
    pub trump_chooser: Option<String>,

    #[serde(rename = "game_over")]
    pub is_game_over: bool,

    /// Names of the winners once the game is over. Older servers omit it.
    #[serde(default)]
    pub winners: Vec<String>,
}

impl RoundState {
    /// Iterates over every card in the record: trump, table, then hand.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.trump_card
            .iter()
            .chain(self.table_cards.iter())
            .chain(self.hand_cards.iter())
    }
}

// ---------------------------------------------------------------------------
// Rights
// ---------------------------------------------------------------------------

/// What the server allows this client to do.
///
/// Only `"creator"` grants anything. Any other status string the server
/// might send maps to `Participant` via `#[serde(other)]`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Rights {
    /// May start the game and kick players.
    Creator,
    #[default]
    #[serde(other)]
    Participant,
}

impl Rights {
    pub fn is_creator(&self) -> bool {
        matches!(self, Self::Creator)
    }
}
