//! Client-side session state for the Wizard card game.
//!
//! The server owns the game. This crate owns the client's *picture* of
//! it and decides what the local player may ask for:
//!
//! 1. **View model**: [`SessionView`], an immutable snapshot of everything
//!    the client knows (roster, round, message log, ...)
//! 2. **State machine**: [`SessionMachine`], the only writer of the view.
//!    It applies decoded server [`Event`](wizard_protocol::Event)s and
//!    transport notifications, and moves the [`Lifecycle`] along.
//! 3. **Guards**: [`guard`], the local checks an action must pass before
//!    it is sent. A failed check is a [`GuardViolation`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Client runtime (above)  ← owns one SessionMachine, publishes snapshots
//!     ↕
//! Session Layer (this crate)  ← lifecycle, view model, guards
//!     ↕
//! Protocol Layer (below)  ← Event, Action, Card, Player types
//! ```

pub mod guard;

mod error;
mod lifecycle;
mod machine;
mod view;

pub use error::GuardViolation;
pub use lifecycle::Lifecycle;
pub use machine::SessionMachine;
pub use view::{MessageKind, SessionMessage, SessionView};
