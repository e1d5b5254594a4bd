//! Wire protocol for the Wizard client.
//!
//! This crate defines the "language" the client and the game server speak:
//!
//! - **Types** ([`Card`], [`Player`], [`RoundState`], ...): the records
//!   that travel inside messages.
//! - **Actions** ([`Action`]): everything the client may send. One flat
//!   JSON object per action, tagged by its `action` field.
//! - **Events** ([`Event`]): everything the server pushes, tagged by its
//!   `type` field.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those values become
//!   bytes and back, plus [`decode_event`] which classifies bad input.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the session
//! state machine. It knows nothing about connections or game phases.
//!
//! ```text
//! Transport (bytes) → Protocol (Event) → Session (view model)
//! Session guards → Protocol (Action) → Transport (bytes)
//! ```

mod action;
mod codec;
mod error;
mod event;
mod types;

pub use action::Action;
pub use codec::{Codec, decode_event};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::Event;
pub use types::{Card, CardFace, Color, Player, Rights, RoundState};
