//! Local checks that run before an action is sent.
//!
//! Every check reads a [`SessionView`] and either approves the action or
//! returns the [`GuardViolation`] explaining why not. Nothing here sends
//! or mutates anything, so the dispatcher can call these on a snapshot.
//!
//! The checks mirror what the game UI allows, not the server's full rule
//! set: a card that passes here may still be refused by the server (for
//! example when it doesn't follow suit), and the server says so with an
//! `error` event.

use wizard_protocol::{Action, CardFace};

use crate::{GuardViolation, Lifecycle, SessionView};

/// `join`: the trimmed name, if it may be submitted now.
///
/// Allowed before the server confirmed a join. While disconnected the name
/// is accepted too; the caller holds on to it until the transport opens.
pub fn check_join(view: &SessionView, name: &str) -> Result<String, GuardViolation> {
    match view.lifecycle() {
        Lifecycle::Disconnected | Lifecycle::AwaitingJoin => {}
        lifecycle => {
            return Err(GuardViolation::WrongPhase {
                action: "join",
                lifecycle,
            });
        }
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(GuardViolation::EmptyName);
    }
    Ok(name.to_string())
}

/// `play_card`: a round is running, it is our turn, announcements are
/// over, and the card is in our hand.
pub fn check_play_card(
    view: &SessionView,
    card: &CardFace,
) -> Result<(), GuardViolation> {
    require_phase(view, "play a card", &[Lifecycle::Running])?;
    if view.is_announcing() {
        return Err(GuardViolation::AnnouncingPhase);
    }
    if !view.has_turn() {
        return Err(GuardViolation::NotYourTurn);
    }
    if !view.hand().iter().any(|c| c.face == *card) {
        return Err(GuardViolation::CardNotInHand(*card));
    }
    Ok(())
}

/// `announce`: announcements are open, it is our turn, and `count` does
/// not exceed the number of cards dealt this round.
pub fn check_announce(view: &SessionView, count: u32) -> Result<(), GuardViolation> {
    let round = match view.round() {
        Some(round) if round.is_announcing_phase => round,
        _ => return Err(GuardViolation::NotAnnouncingPhase),
    };
    if !view.has_turn() {
        return Err(GuardViolation::NotYourTurn);
    }
    if count > round.round_number {
        return Err(GuardViolation::AnnouncementTooHigh {
            count,
            round: round.round_number,
        });
    }
    Ok(())
}

/// `choose_trump`: the server named us as the trump chooser.
pub fn check_choose_trump(view: &SessionView) -> Result<(), GuardViolation> {
    if view.is_trump_chooser() {
        Ok(())
    } else {
        Err(GuardViolation::NotTrumpChooser)
    }
}

/// `start_game`: we created the game, and no game is in progress.
pub fn check_start_game(view: &SessionView) -> Result<(), GuardViolation> {
    if !view.is_creator() {
        return Err(GuardViolation::NotCreator("start the game"));
    }
    require_phase(
        view,
        "start the game",
        &[Lifecycle::Joined, Lifecycle::GameOver],
    )
}

/// `kick`: we created the game. Returns the distinct, trimmed names in the
/// order given; blank names are skipped.
pub fn check_kick<S: AsRef<str>>(
    view: &SessionView,
    names: &[S],
) -> Result<Vec<String>, GuardViolation> {
    if !view.is_creator() {
        return Err(GuardViolation::NotCreator("kick players"));
    }

    let mut targets: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref().trim();
        if !name.is_empty() && !targets.iter().any(|t| t == name) {
            targets.push(name.to_string());
        }
    }
    if targets.is_empty() {
        return Err(GuardViolation::NoKickTargets);
    }
    Ok(targets)
}

/// `rejoin`: the name to send again, once one was submitted.
pub fn check_rejoin(view: &SessionView) -> Result<String, GuardViolation> {
    view.local_player_name()
        .map(str::to_string)
        .ok_or(GuardViolation::NoNameSubmitted)
}

/// Runs the check that matches `action`.
///
/// For `Join` this validates the name as given; callers that want the
/// trimmed name should use [`check_join`] directly.
pub fn authorize(view: &SessionView, action: &Action) -> Result<(), GuardViolation> {
    match action {
        Action::Join { name } => check_join(view, name).map(drop),
        Action::PlayCard { card } => check_play_card(view, card),
        Action::Announce { announcement } => check_announce(view, *announcement),
        Action::ChooseTrump { .. } => check_choose_trump(view),
        Action::StartGame => check_start_game(view),
        Action::Kick { user } => check_kick(view, &[user]).map(drop),
    }
}

fn require_phase(
    view: &SessionView,
    action: &'static str,
    allowed: &[Lifecycle],
) -> Result<(), GuardViolation> {
    let lifecycle = view.lifecycle();
    if allowed.contains(&lifecycle) {
        Ok(())
    } else {
        Err(GuardViolation::WrongPhase { action, lifecycle })
    }
}
