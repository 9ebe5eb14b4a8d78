//! Dialogue transition table
//!
//! [`step`] is a pure function of the current session and one event. It
//! never touches the session store or any sink; the caller stores
//! [`Transition::next`] and performs [`Transition::effect`].

use super::messages::{self, CANCEL, CONFIRM_PROCEED, CONFIRM_SUBMIT};
use super::{Effect, Event, Reply};
use crate::session::{SessionState, Stage};
use crate::submission::{Activity, PhotoHandle, SubmissionType};
use crate::validation::parse_details;
use tracing::debug;

/// Outcome of feeding one event to the dialogue
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Session after the event; `Stage::Idle` means the session is cleared
    pub next: SessionState,
    pub replies: Vec<Reply>,
    pub effect: Option<Effect>,
}

impl Transition {
    fn to(next: SessionState, replies: Vec<Reply>) -> Self {
        Self {
            next,
            replies,
            effect: None,
        }
    }

    fn stay(current: SessionState, reply: Reply) -> Self {
        Self::to(current, vec![reply])
    }

    fn cleared(replies: Vec<Reply>) -> Self {
        Self::to(idle(), replies)
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }

    pub fn stage(&self) -> Stage {
        self.next.stage
    }
}

fn idle() -> SessionState {
    SessionState::started().at(Stage::Idle)
}

/// Apply one event to a submitter's session.
///
/// Commands are handled the same way in every stage: start always opens a
/// fresh session, cancel always clears it, help and review never change
/// it. Everything else is dispatched on the current stage.
pub fn step(current: Option<SessionState>, event: Event) -> Transition {
    let current = current.unwrap_or_else(idle);
    let from = current.stage;
    let kind = event.kind();

    let transition = match event {
        Event::StartCmd => Transition::to(SessionState::started(), vec![messages::choose_type()]),
        Event::HelpCmd => Transition::stay(current, Reply::text(messages::WELCOME)),
        Event::ReviewCmd => Transition::to(current, Vec::new()).with_effect(Effect::Review),
        Event::CancelCmd => cancel(current),
        ref e if e.label() == Some(CANCEL) => cancel(current),
        event => match from {
            Stage::Idle => Transition::stay(current, Reply::text(messages::NOT_STARTED)),
            Stage::SelectType => select_type(current, &event),
            Stage::SelectActivity => select_activity(current, &event),
            Stage::CollectOtherActivityLabel => collect_other_activity(current, event),
            Stage::AwaitingData => awaiting_data(current, event),
            Stage::Confirm => confirm(current, &event),
        },
    };

    debug!(
        "Dialogue transition {} --{:?}--> {}",
        from,
        kind,
        transition.stage()
    );
    transition
}

fn cancel(current: SessionState) -> Transition {
    if current.stage.is_terminal() {
        return Transition::stay(current, Reply::text(messages::NOT_STARTED));
    }
    Transition::cleared(vec![Reply::removing_keyboard(messages::CANCELLED)])
}

fn select_type(mut current: SessionState, event: &Event) -> Transition {
    match event.label().and_then(SubmissionType::from_label) {
        Some(SubmissionType::GeneralActivity) => {
            current.partial.submission_type = Some(SubmissionType::GeneralActivity);
            Transition::to(
                current.at(Stage::SelectActivity),
                vec![messages::choose_activity("Which activity are you reporting?")],
            )
        }
        Some(submission_type) => {
            current.partial.submission_type = Some(submission_type);
            current.partial.activity = None;
            Transition::to(current.at(Stage::AwaitingData), vec![messages::request_data()])
        }
        None => Transition::stay(current, messages::choose_type_again()),
    }
}

fn select_activity(mut current: SessionState, event: &Event) -> Transition {
    match event.label().and_then(Activity::from_label) {
        Some(Activity::Others) => Transition::to(
            current.at(Stage::CollectOtherActivityLabel),
            vec![Reply::removing_keyboard(messages::ASK_OTHER_ACTIVITY)],
        ),
        Some(activity) => {
            current.partial.activity = Some(activity.label().to_string());
            Transition::to(current.at(Stage::AwaitingData), vec![messages::request_data()])
        }
        None => Transition::stay(
            current,
            messages::choose_activity("Please choose one of the activities below."),
        ),
    }
}

fn collect_other_activity(mut current: SessionState, event: Event) -> Transition {
    match event {
        Event::TextMessage { body } => {
            let label = body.trim();
            if label.is_empty() {
                return Transition::stay(current, Reply::text(messages::EMPTY_ACTIVITY));
            }
            if label.contains(['\n', '\r']) {
                return Transition::stay(current, Reply::text(messages::MULTILINE_ACTIVITY));
            }
            current.partial.activity = Some(label.to_string());
            Transition::to(current.at(Stage::AwaitingData), vec![messages::request_data()])
        }
        Event::PhotoMessage { .. } => Transition::stay(current, messages::not_expecting_photo()),
        _ => Transition::stay(current, Reply::text(messages::ASK_OTHER_ACTIVITY)),
    }
}

fn awaiting_data(current: SessionState, event: Event) -> Transition {
    if event.label() == Some(CONFIRM_PROCEED) {
        return proceed_to_confirm(current);
    }

    match event {
        Event::PhotoMessage { id, caption } => accept_photo(current, id, caption),
        Event::TextMessage { body } => accept_details(current, &body),
        _ => Transition::stay(current, messages::request_data()),
    }
}

fn proceed_to_confirm(current: SessionState) -> Transition {
    if current.photo_count() == 0 {
        return Transition::stay(current, Reply::text(messages::PHOTO_MISSING));
    }
    if !current.details_received() {
        return Transition::stay(current, Reply::text(messages::DETAILS_MISSING));
    }
    let next = current.at(Stage::Confirm);
    let replies = messages::summary(&next);
    Transition::to(next, replies)
}

fn accept_details(mut current: SessionState, body: &str) -> Transition {
    match parse_details(body) {
        Ok(details) => {
            current.partial.details = Some(details);
            let reply = messages::details_received(current.photo_count());
            Transition::stay(current, reply)
        }
        Err(e) => {
            debug!("Rejected detail block: {}", e);
            Transition::stay(current, Reply::text(messages::FORMAT_ERROR))
        }
    }
}

fn accept_photo(
    mut current: SessionState,
    id: PhotoHandle,
    caption: Option<String>,
) -> Transition {
    let caption = caption.filter(|c| !c.trim().is_empty());
    let mut details_from_caption = false;

    if let Some(caption) = caption {
        if !current.details_received() {
            match parse_details(&caption) {
                Ok(details) => {
                    current.partial.details = Some(details);
                    details_from_caption = true;
                }
                Err(e) => {
                    debug!("Rejected photo caption: {}", e);
                    return Transition::stay(current, Reply::text(messages::FORMAT_ERROR));
                }
            }
        }
    }

    current.partial.photos.push(id);
    let reply = messages::photo_received(current.photo_count(), details_from_caption);
    Transition::stay(current, reply)
}

fn confirm(current: SessionState, event: &Event) -> Transition {
    if event.label() == Some(CONFIRM_SUBMIT) {
        let partial = current.partial;
        return Transition::cleared(vec![Reply::removing_keyboard(messages::SUBMITTING)])
            .with_effect(Effect::Finalize(partial));
    }
    Transition::stay(
        current,
        Reply::with_buttons(messages::CONFIRM_PENDING, vec![vec![CONFIRM_SUBMIT, CANCEL]]),
    )
}
