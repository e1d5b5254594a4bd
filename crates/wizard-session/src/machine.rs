//! The session state machine: the single writer of the [`SessionView`].
//!
//! Everything that can change the client's picture of the game goes
//! through here: decoded server events, transport notifications, and the
//! name the user submits. Each accepted change bumps the view's revision
//! by exactly one.
//!
//! # Concurrency note
//!
//! `SessionMachine` is a plain struct with `&mut self` methods. The client
//! runtime owns it inside one task and publishes `Arc<SessionView>`
//! snapshots, so readers never hold a lock on the live state.

use std::sync::Arc;

use tracing::{debug, info};
use wizard_protocol::{Card, Event, Player, RoundState};

use crate::{Lifecycle, SessionMessage, SessionView};

/// Log line appended when the server confirms our join.
const JOINED_TEXT: &str = "Joined game!";

/// Owns and mutates one [`SessionView`].
#[derive(Debug, Default)]
pub struct SessionMachine {
    view: SessionView,
}

impl SessionMachine {
    /// A machine in [`Lifecycle::Disconnected`] with an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// The live view. Borrowed, so it can't outlive the next change.
    pub fn view(&self) -> &SessionView {
        &self.view
    }

    /// A shared, immutable copy of the current view for renderers.
    pub fn snapshot(&self) -> Arc<SessionView> {
        Arc::new(self.view.clone())
    }

    // -----------------------------------------------------------------
    // Transport and user input
    // -----------------------------------------------------------------

    /// Starts a new session: empty view, back to `Disconnected`.
    ///
    /// Called for a fresh, explicit connect. The revision keeps counting
    /// so subscribers still see a change.
    pub fn reset(&mut self) {
        let revision = self.view.revision;
        self.view = SessionView {
            revision,
            ..SessionView::default()
        };
        self.commit();
        info!("session reset");
    }

    /// The transport opened. `Disconnected` moves to `AwaitingJoin`; any
    /// later state (this was a reconnect) stays where it is.
    ///
    /// Returns `true` if the view changed.
    pub fn on_connected(&mut self) -> bool {
        if self.view.lifecycle != Lifecycle::Disconnected {
            debug!(lifecycle = %self.view.lifecycle, "transport reconnected, lifecycle kept");
            return false;
        }
        self.transition(Lifecycle::AwaitingJoin);
        self.commit();
        true
    }

    /// The transport closed without being asked to. The view is kept as
    /// is: the link reconnects underneath and the game carries on.
    pub fn on_transport_closed(&mut self) {
        debug!(lifecycle = %self.view.lifecycle, "transport closed, keeping view");
    }

    /// Records the name the user is joining with. Not confirmed until the
    /// server sends `joined`.
    pub fn submit_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        debug!(%name, "name submitted");
        self.view.local_player_name = Some(name);
        self.view.name_confirmed = false;
        self.commit();
    }

    // -----------------------------------------------------------------
    // Server events
    // -----------------------------------------------------------------

    /// Applies one server event.
    ///
    /// Returns `true` if the view changed. Events that don't fit the
    /// current lifecycle (a `state` before `joined`, anything while
    /// disconnected except log and management records) are dropped and
    /// logged.
    pub fn apply(&mut self, event: Event) -> bool {
        let kind = event.kind();
        let applied = match event {
            Event::Joined => self.on_joined(),
            Event::StateUpdate(state) => self.on_state(state),
            Event::RosterUpdate { players } => self.on_roster(players),
            Event::RightsUpdate { status } => {
                self.when_connected(kind, |view| {
                    view.is_creator = status.is_creator();
                })
            }
            Event::Info { msg } => {
                self.view.messages.push(SessionMessage::info(msg));
                true
            }
            Event::Error { msg } => {
                self.view.messages.push(SessionMessage::error(msg));
                true
            }
            Event::ManagementUpdate { waiting_for } => {
                self.view.waiting_for = waiting_for;
                true
            }
        };

        if applied {
            self.commit();
        }
        applied
    }

    fn on_joined(&mut self) -> bool {
        match self.view.lifecycle {
            Lifecycle::Disconnected | Lifecycle::AwaitingJoin => {
                self.transition(Lifecycle::Joined);
                self.view.name_confirmed = true;
                self.view.messages.push(SessionMessage::info(JOINED_TEXT));
                info!(
                    name = self.view.local_player_name.as_deref().unwrap_or(""),
                    "joined game"
                );
                true
            }
            // A rejoin after reconnecting: confirm, don't go backwards.
            Lifecycle::Joined | Lifecycle::Running | Lifecycle::GameOver => {
                debug!(lifecycle = %self.view.lifecycle, "repeated joined");
                self.view.name_confirmed = true;
                true
            }
        }
    }

    fn on_state(&mut self, mut state: RoundState) -> bool {
        if !self.view.lifecycle.has_joined() {
            debug!(
                lifecycle = %self.view.lifecycle,
                "dropping state update received before joined"
            );
            return false;
        }

        // Hands never carry an owner, whatever the server sent.
        state.hand_cards = state
            .hand_cards
            .into_iter()
            .map(Card::without_owner)
            .collect();

        let next = if state.is_game_over {
            Lifecycle::GameOver
        } else {
            Lifecycle::Running
        };
        if next == Lifecycle::Running && self.view.lifecycle == Lifecycle::GameOver {
            info!("new game started");
        }
        self.transition(next);
        self.view.round = Some(state);
        true
    }

    fn on_roster(&mut self, players: Vec<Player>) -> bool {
        self.when_connected("player", |view| view.roster = players)
    }

    /// Runs `update` unless the session is disconnected.
    fn when_connected(
        &mut self,
        kind: &str,
        update: impl FnOnce(&mut SessionView),
    ) -> bool {
        if self.view.lifecycle == Lifecycle::Disconnected {
            debug!(kind, "dropping event received while disconnected");
            return false;
        }
        update(&mut self.view);
        true
    }

    fn transition(&mut self, next: Lifecycle) {
        if self.view.lifecycle != next {
            debug!(from = %self.view.lifecycle, to = %next, "lifecycle transition");
            self.view.lifecycle = next;
        }
    }

    fn commit(&mut self) {
        self.view.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wizard_protocol::{Color, Rights};

    fn state(round_number: u32, game_over: bool) -> RoundState {
        RoundState {
            table_cards: vec![Card::number(Color::Red, 3).with_owner("bob")],
            trump_card: Some(Card::wizard()),
            hand_cards: vec![Card::fool(), Card::number(Color::Blue, 9)],
            round_number,
            is_announcing_phase: false,
            trump_chooser: None,
            is_game_over: game_over,
            winners: vec![],
        }
    }

    /// A machine that has connected and been accepted as `name`.
    fn joined(name: &str) -> SessionMachine {
        let mut machine = SessionMachine::new();
        machine.on_connected();
        machine.submit_name(name);
        machine.apply(Event::Joined);
        machine
    }

    // =====================================================================
    // Lifecycle
    // =====================================================================

    #[test]
    fn test_new_machine_is_disconnected() {
        let machine = SessionMachine::new();
        assert_eq!(machine.view().lifecycle(), Lifecycle::Disconnected);
        assert_eq!(machine.view().revision(), 0);
    }

    #[test]
    fn test_on_connected_moves_to_awaiting_join() {
        let mut machine = SessionMachine::new();
        assert!(machine.on_connected());
        assert_eq!(machine.view().lifecycle(), Lifecycle::AwaitingJoin);
    }

    #[test]
    fn test_submit_name_stays_awaiting_and_unconfirmed() {
        let mut machine = SessionMachine::new();
        machine.on_connected();
        machine.submit_name("ada");

        let view = machine.view();
        assert_eq!(view.lifecycle(), Lifecycle::AwaitingJoin);
        assert_eq!(view.local_player_name(), Some("ada"));
        assert!(!view.is_name_confirmed());
    }

    #[test]
    fn test_joined_confirms_name_and_logs_message() {
        let machine = joined("ada");
        let view = machine.view();

        assert_eq!(view.lifecycle(), Lifecycle::Joined);
        assert!(view.is_name_confirmed());
        assert_eq!(view.messages(), &[SessionMessage::info("Joined game!")]);
    }

    #[test]
    fn test_full_lifecycle_joined_running_game_over_and_new_game() {
        let mut machine = joined("ada");

        machine.apply(Event::StateUpdate(state(1, false)));
        assert_eq!(machine.view().lifecycle(), Lifecycle::Running);

        machine.apply(Event::StateUpdate(state(3, true)));
        assert_eq!(machine.view().lifecycle(), Lifecycle::GameOver);

        machine.apply(Event::StateUpdate(state(1, false)));
        assert_eq!(machine.view().lifecycle(), Lifecycle::Running);
    }

    #[test]
    fn test_state_update_game_over_from_joined_goes_to_game_over() {
        let mut machine = joined("ada");
        machine.apply(Event::StateUpdate(state(1, true)));
        assert_eq!(machine.view().lifecycle(), Lifecycle::GameOver);
    }

    #[test]
    fn test_state_update_before_joined_is_dropped() {
        let mut machine = SessionMachine::new();
        machine.on_connected();
        let before = machine.view().clone();

        assert!(!machine.apply(Event::StateUpdate(state(1, false))));
        assert_eq!(machine.view(), &before);
    }

    #[test]
    fn test_repeated_joined_does_not_regress() {
        let mut machine = joined("ada");
        machine.apply(Event::StateUpdate(state(2, false)));
        let messages = machine.view().messages().len();

        assert!(machine.apply(Event::Joined));
        assert_eq!(machine.view().lifecycle(), Lifecycle::Running);
        assert_eq!(machine.view().messages().len(), messages);
    }

    #[test]
    fn test_transport_closed_keeps_view() {
        let mut machine = joined("ada");
        machine.apply(Event::StateUpdate(state(2, false)));
        let before = machine.view().clone();

        machine.on_transport_closed();
        assert!(!machine.on_connected());

        assert_eq!(machine.view(), &before);
        assert_eq!(machine.view().lifecycle(), Lifecycle::Running);
    }

    #[test]
    fn test_reset_clears_view_and_keeps_counting_revisions() {
        let mut machine = joined("ada");
        let revision = machine.view().revision();

        machine.reset();

        let view = machine.view();
        assert_eq!(view.lifecycle(), Lifecycle::Disconnected);
        assert_eq!(view.local_player_name(), None);
        assert!(view.messages().is_empty());
        assert_eq!(view.revision(), revision + 1);
    }

    // =====================================================================
    // Full replacements
    // =====================================================================

    #[test]
    fn test_state_update_strips_owner_from_hand() {
        let mut round = state(1, false);
        round.hand_cards = vec![Card::wizard().with_owner("ada")];
        let mut machine = joined("ada");

        machine.apply(Event::StateUpdate(round));

        assert_eq!(machine.view().hand(), &[Card::wizard()]);
        // Table cards keep theirs.
        let table = &machine.view().round().unwrap().table_cards;
        assert_eq!(table[0].owner.as_deref(), Some("bob"));
    }

    #[test]
    fn test_state_update_twice_is_idempotent_but_bumps_revision() {
        let mut machine = joined("ada");
        machine.apply(Event::StateUpdate(state(2, false)));
        let first = machine.view().clone();

        machine.apply(Event::StateUpdate(state(2, false)));

        assert_eq!(machine.view().round(), first.round());
        assert_eq!(machine.view().lifecycle(), first.lifecycle());
        assert_eq!(machine.view().revision(), first.revision() + 1);
    }

    #[test]
    fn test_roster_update_replaces_wholesale() {
        let mut machine = joined("ada");
        machine.apply(Event::RosterUpdate {
            players: vec![Player::new("ada"), Player::new("bob")],
        });
        machine.apply(Event::RosterUpdate {
            players: vec![Player::new("carol")],
        });

        let names: Vec<&str> =
            machine.view().roster().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["carol"]);
    }

    #[test]
    fn test_roster_update_applies_while_awaiting_join() {
        let mut machine = SessionMachine::new();
        machine.on_connected();

        assert!(machine.apply(Event::RosterUpdate {
            players: vec![Player::new("bob")],
        }));
        assert_eq!(machine.view().roster().len(), 1);
    }

    #[test]
    fn test_roster_update_while_disconnected_is_dropped() {
        let mut machine = SessionMachine::new();
        assert!(!machine.apply(Event::RosterUpdate {
            players: vec![Player::new("bob")],
        }));
        assert!(machine.view().roster().is_empty());
    }

    #[test]
    fn test_rights_update_sets_and_clears_creator() {
        let mut machine = joined("ada");

        machine.apply(Event::RightsUpdate { status: Rights::Creator });
        assert!(machine.view().is_creator());

        machine.apply(Event::RightsUpdate { status: Rights::Participant });
        assert!(!machine.view().is_creator());
    }

    // =====================================================================
    // Message log and management
    // =====================================================================

    #[test]
    fn test_info_and_error_append_in_order() {
        let mut machine = SessionMachine::new();
        machine.apply(Event::Info { msg: "one".into() });
        machine.apply(Event::Error { msg: "two".into() });
        machine.apply(Event::Info { msg: "three".into() });

        assert_eq!(
            machine.view().messages(),
            &[
                SessionMessage::info("one"),
                SessionMessage::error("two"),
                SessionMessage::info("three"),
            ]
        );
    }

    #[test]
    fn test_error_does_not_change_lifecycle() {
        let mut machine = joined("ada");
        machine.apply(Event::Error { msg: "Not your turn".into() });
        assert_eq!(machine.view().lifecycle(), Lifecycle::Joined);
    }

    #[test]
    fn test_management_update_replaces_waiting_list() {
        let mut machine = joined("ada");
        machine.apply(Event::ManagementUpdate {
            waiting_for: vec!["bob".into(), "carol".into()],
        });
        assert_eq!(machine.view().waiting_for(), &["bob", "carol"]);

        machine.apply(Event::ManagementUpdate { waiting_for: vec![] });
        assert!(machine.view().waiting_for().is_empty());
    }

    #[test]
    fn test_snapshot_is_detached_from_later_changes() {
        let mut machine = joined("ada");
        let snapshot = machine.snapshot();

        machine.apply(Event::Info { msg: "later".into() });

        assert_eq!(snapshot.messages().len(), 1);
        assert_eq!(machine.view().messages().len(), 2);
    }
}
