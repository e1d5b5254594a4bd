//! The action dispatcher: guard → encode → send.
//!
//! Each user action is checked against the current view (see
//! [`wizard_session::guard`]), encoded with the client's [`Codec`], and
//! handed to the link without waiting for an answer. Whatever the server
//! makes of it comes back later as events.
//!
//! A `join` issued before the transport is up is not an error: the name is
//! held back and sent by [`Dispatcher::flush_pending_join`] as soon as the
//! connection opens.

use tracing::{debug, warn};
use wizard_protocol::{Action, CardFace, Codec, Color};
use wizard_session::{GuardViolation, Lifecycle, SessionMachine, SessionView, guard};
use wizard_transport::{LinkHandle, TransportError};

use crate::ClientError;

/// Somewhere encoded frames can be sent.
///
/// [`LinkHandle`] is the real implementation; tests record frames instead.
pub trait Outbound {
    /// Queues one frame. Must not wait on the network.
    fn send_frame(&self, frame: Vec<u8>) -> Result<(), TransportError>;
}

impl Outbound for LinkHandle {
    fn send_frame(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.send(frame)
    }
}

/// Validates, encodes, and sends actions.
#[derive(Debug)]
pub struct Dispatcher<C: Codec> {
    codec: C,
    pending_join: Option<String>,
}

impl<C: Codec> Dispatcher<C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            pending_join: None,
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// The name waiting for the transport to open, if any.
    pub fn pending_join(&self) -> Option<&str> {
        self.pending_join.as_deref()
    }

    /// Submits `name` and sends `join`, or holds it back until the
    /// transport is connected.
    pub fn join<O: Outbound>(
        &mut self,
        machine: &mut SessionMachine,
        out: Option<&O>,
        name: &str,
    ) -> Result<(), ClientError> {
        let name = guard::check_join(machine.view(), name).map_err(rejected("join"))?;
        machine.submit_name(name.clone());

        if machine.view().lifecycle() == Lifecycle::Disconnected {
            debug!(%name, "join deferred until connected");
            self.pending_join = Some(name);
            return Ok(());
        }

        match self.send(out, &Action::Join { name: name.clone() }) {
            Ok(()) => {
                self.pending_join = None;
                Ok(())
            }
            Err(ClientError::Transport(TransportError::NotConnected)) => {
                debug!(%name, "link is down, join deferred");
                self.pending_join = Some(name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Sends the held-back `join`, if there is one.
    ///
    /// Returns `true` if a frame was sent. On failure the name stays
    /// pending for the next attempt.
    pub fn flush_pending_join<O: Outbound>(
        &mut self,
        out: &O,
    ) -> Result<bool, ClientError> {
        let Some(name) = self.pending_join.take() else {
            return Ok(false);
        };
        let action = Action::Join { name };
        match self.send(Some(out), &action) {
            Ok(()) => Ok(true),
            Err(e) => {
                if let Action::Join { name } = action {
                    self.pending_join = Some(name);
                }
                Err(e)
            }
        }
    }

    /// Sends `join` again with the name given earlier.
    pub fn rejoin<O: Outbound>(
        &mut self,
        view: &SessionView,
        out: Option<&O>,
    ) -> Result<(), ClientError> {
        let name = guard::check_rejoin(view).map_err(rejected("rejoin"))?;
        self.pending_join = None;
        self.send(out, &Action::Join { name })
    }

    pub fn play_card<O: Outbound>(
        &self,
        view: &SessionView,
        out: Option<&O>,
        card: CardFace,
    ) -> Result<(), ClientError> {
        guard::check_play_card(view, &card).map_err(rejected("play_card"))?;
        self.send(out, &Action::PlayCard { card })
    }

    pub fn announce<O: Outbound>(
        &self,
        view: &SessionView,
        out: Option<&O>,
        count: u32,
    ) -> Result<(), ClientError> {
        guard::check_announce(view, count).map_err(rejected("announce"))?;
        self.send(out, &Action::Announce { announcement: count })
    }

    pub fn choose_trump<O: Outbound>(
        &self,
        view: &SessionView,
        out: Option<&O>,
        color: Color,
    ) -> Result<(), ClientError> {
        guard::check_choose_trump(view).map_err(rejected("choose_trump"))?;
        self.send(out, &Action::ChooseTrump { color })
    }

    pub fn start_game<O: Outbound>(
        &self,
        view: &SessionView,
        out: Option<&O>,
    ) -> Result<(), ClientError> {
        guard::check_start_game(view).map_err(rejected("start_game"))?;
        self.send(out, &Action::StartGame)
    }

    /// Sends one `kick` per distinct name.
    pub fn kick<O: Outbound, S: AsRef<str>>(
        &self,
        view: &SessionView,
        out: Option<&O>,
        names: &[S],
    ) -> Result<(), ClientError> {
        let targets = guard::check_kick(view, names).map_err(rejected("kick"))?;
        for user in targets {
            self.send(out, &Action::Kick { user })?;
        }
        Ok(())
    }

    fn send<O: Outbound>(
        &self,
        out: Option<&O>,
        action: &Action,
    ) -> Result<(), ClientError> {
        let out = out.ok_or(TransportError::NotConnected)?;
        let frame = self.codec.encode(action)?;
        out.send_frame(frame).inspect_err(|e| {
            warn!(action = action.name(), error = %e, "action not sent");
        })?;
        debug!(action = action.name(), "action sent");
        Ok(())
    }
}

/// Logs a local rejection and turns it into a [`ClientError`].
fn rejected(action: &'static str) -> impl Fn(GuardViolation) -> ClientError {
    move |violation| {
        debug!(action, %violation, "action rejected locally");
        ClientError::Rejected(violation)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use serde_json::{Value, json};
    use wizard_protocol::{Card, Event, JsonCodec, Player, Rights, RoundState};

    /// Records frames; fails with `NotConnected` while `down` is set.
    #[derive(Default)]
    struct Recorder {
        frames: RefCell<Vec<Vec<u8>>>,
        down: bool,
    }

    impl Outbound for Recorder {
        fn send_frame(&self, frame: Vec<u8>) -> Result<(), TransportError> {
            if self.down {
                return Err(TransportError::NotConnected);
            }
            self.frames.borrow_mut().push(frame);
            Ok(())
        }
    }

    impl Recorder {
        fn sent(&self) -> Vec<Value> {
            self.frames
                .borrow()
                .iter()
                .map(|f| serde_json::from_slice(f).unwrap())
                .collect()
        }
    }

    fn connected_machine() -> SessionMachine {
        let mut machine = SessionMachine::new();
        machine.on_connected();
        machine
    }

    fn joined_machine(events: Vec<Event>) -> SessionMachine {
        let mut machine = connected_machine();
        machine.submit_name("ada");
        machine.apply(Event::Joined);
        for event in events {
            machine.apply(event);
        }
        machine
    }

    fn running_round() -> Event {
        Event::StateUpdate(RoundState {
            table_cards: vec![],
            trump_card: None,
            hand_cards: vec![Card::wizard()],
            round_number: 1,
            is_announcing_phase: false,
            trump_chooser: None,
            is_game_over: false,
            winners: vec![],
        })
    }

    fn roster(on_turn: &str) -> Event {
        Event::RosterUpdate {
            players: ["ada", "bob"]
                .into_iter()
                .map(|n| Player {
                    has_turn: n == on_turn,
                    ..Player::new(n)
                })
                .collect(),
        }
    }

    #[test]
    fn test_join_connected_sends_trimmed_name() {
        let mut dispatcher = Dispatcher::new(JsonCodec);
        let mut machine = connected_machine();
        let out = Recorder::default();

        dispatcher.join(&mut machine, Some(&out), "  ada ").unwrap();

        assert_eq!(out.sent(), vec![json!({"action": "join", "name": "ada"})]);
        assert_eq!(machine.view().local_player_name(), Some("ada"));
        assert_eq!(dispatcher.pending_join(), None);
    }

    #[test]
    fn test_join_disconnected_is_deferred_then_flushed() {
        let mut dispatcher = Dispatcher::new(JsonCodec);
        let mut machine = SessionMachine::new();
        let out = Recorder::default();

        dispatcher.join::<Recorder>(&mut machine, None, "ada").unwrap();
        assert_eq!(dispatcher.pending_join(), Some("ada"));
        assert!(out.sent().is_empty());

        machine.on_connected();
        assert!(dispatcher.flush_pending_join(&out).unwrap());
        assert_eq!(out.sent(), vec![json!({"action": "join", "name": "ada"})]);

        // Nothing left to flush.
        assert!(!dispatcher.flush_pending_join(&out).unwrap());
    }

    #[test]
    fn test_join_while_link_down_is_deferred() {
        let mut dispatcher = Dispatcher::new(JsonCodec);
        let mut machine = connected_machine();
        let out = Recorder {
            down: true,
            ..Recorder::default()
        };

        dispatcher.join(&mut machine, Some(&out), "ada").unwrap();
        assert_eq!(dispatcher.pending_join(), Some("ada"));
    }

    #[test]
    fn test_flush_pending_join_failure_keeps_name() {
        let mut dispatcher = Dispatcher::new(JsonCodec);
        let mut machine = SessionMachine::new();
        dispatcher.join::<Recorder>(&mut machine, None, "ada").unwrap();

        let down = Recorder {
            down: true,
            ..Recorder::default()
        };
        assert!(dispatcher.flush_pending_join(&down).is_err());
        assert_eq!(dispatcher.pending_join(), Some("ada"));
    }

    #[test]
    fn test_join_empty_name_sends_nothing() {
        let mut dispatcher = Dispatcher::new(JsonCodec);
        let mut machine = connected_machine();
        let out = Recorder::default();

        let err = dispatcher.join(&mut machine, Some(&out), " ").unwrap_err();

        assert_eq!(err.violation(), Some(&GuardViolation::EmptyName));
        assert!(out.sent().is_empty());
        assert_eq!(machine.view().local_player_name(), None);
    }

    #[test]
    fn test_play_card_without_turn_sends_nothing() {
        let dispatcher = Dispatcher::new(JsonCodec);
        let machine = joined_machine(vec![running_round(), roster("bob")]);
        let out = Recorder::default();

        let err = dispatcher
            .play_card(machine.view(), Some(&out), CardFace::Wizard)
            .unwrap_err();

        assert_eq!(err.violation(), Some(&GuardViolation::NotYourTurn));
        assert!(out.sent().is_empty());
    }

    #[test]
    fn test_play_card_on_turn_sends_flat_action() {
        let dispatcher = Dispatcher::new(JsonCodec);
        let machine = joined_machine(vec![running_round(), roster("ada")]);
        let out = Recorder::default();

        dispatcher
            .play_card(machine.view(), Some(&out), CardFace::Wizard)
            .unwrap();

        assert_eq!(out.sent(), vec![json!({"action": "play_card", "type": "wizard"})]);
    }

    #[test]
    fn test_kick_non_creator_sends_nothing() {
        let dispatcher = Dispatcher::new(JsonCodec);
        let machine = joined_machine(vec![]);
        let out = Recorder::default();

        let result = dispatcher.kick(machine.view(), Some(&out), &["bob"]);

        assert!(matches!(
            result,
            Err(ClientError::Rejected(GuardViolation::NotCreator(_)))
        ));
        assert!(out.sent().is_empty());
    }

    #[test]
    fn test_kick_sends_one_action_per_distinct_name() {
        let dispatcher = Dispatcher::new(JsonCodec);
        let machine =
            joined_machine(vec![Event::RightsUpdate { status: Rights::Creator }]);
        let out = Recorder::default();

        dispatcher
            .kick(machine.view(), Some(&out), &["bob", "carol", "bob"])
            .unwrap();

        assert_eq!(
            out.sent(),
            vec![
                json!({"action": "kick", "user": "bob"}),
                json!({"action": "kick", "user": "carol"}),
            ]
        );
    }

    #[test]
    fn test_start_game_without_link_returns_not_connected() {
        let dispatcher = Dispatcher::new(JsonCodec);
        let machine =
            joined_machine(vec![Event::RightsUpdate { status: Rights::Creator }]);

        let result = dispatcher.start_game::<Recorder>(machine.view(), None);

        assert!(matches!(
            result,
            Err(ClientError::Transport(TransportError::NotConnected))
        ));
    }

    #[test]
    fn test_rejoin_resends_stored_name() {
        let mut dispatcher = Dispatcher::new(JsonCodec);
        let machine = joined_machine(vec![]);
        let out = Recorder::default();

        dispatcher.rejoin(machine.view(), Some(&out)).unwrap();

        assert_eq!(out.sent(), vec![json!({"action": "join", "name": "ada"})]);
    }

    #[test]
    fn test_announce_and_choose_trump_encode() {
        let dispatcher = Dispatcher::new(JsonCodec);
        let mut round = match running_round() {
            Event::StateUpdate(r) => r,
            _ => unreachable!(),
        };
        round.is_announcing_phase = true;
        round.trump_chooser = Some("ada".into());
        let machine = joined_machine(vec![Event::StateUpdate(round), roster("ada")]);
        let out = Recorder::default();

        dispatcher.announce(machine.view(), Some(&out), 1).unwrap();
        dispatcher
            .choose_trump(machine.view(), Some(&out), Color::Blue)
            .unwrap();

        assert_eq!(
            out.sent(),
            vec![
                json!({"action": "announce", "announcement": 1}),
                json!({"action": "choose_trump", "color": "blue"}),
            ]
        );
    }
}
