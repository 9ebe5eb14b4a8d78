//! Inputs and outputs of the dialogue machine

use crate::submission::{PartialSubmission, PhotoHandle};
use serde::{Deserialize, Serialize};

/// Input event delivered by the chat transport for one submitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    StartCmd,
    CancelCmd,
    HelpCmd,
    ReviewCmd,
    ButtonPress { data: String },
    TextMessage { body: String },
    PhotoMessage {
        id: PhotoHandle,
        caption: Option<String>,
    },
}

/// Discriminant of [`Event`] used for logging and table lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Cancel,
    Help,
    Review,
    Button,
    Text,
    Photo,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::StartCmd => EventKind::Start,
            Event::CancelCmd => EventKind::Cancel,
            Event::HelpCmd => EventKind::Help,
            Event::ReviewCmd => EventKind::Review,
            Event::ButtonPress { .. } => EventKind::Button,
            Event::TextMessage { .. } => EventKind::Text,
            Event::PhotoMessage { .. } => EventKind::Photo,
        }
    }

    /// Label carried by a button press or a text message typed from a
    /// reply keyboard
    pub fn label(&self) -> Option<&str> {
        match self {
            Event::ButtonPress { data } => Some(data.trim()),
            Event::TextMessage { body } => Some(body.trim()),
            _ => None,
        }
    }

    /// Parse a command line such as `/start` or `/cancel@SomeBot`
    pub fn from_command(text: &str) -> Option<Self> {
        let command = text.trim().strip_prefix('/')?;
        let command = command.split_whitespace().next().unwrap_or_default();
        let command = command.split('@').next().unwrap_or_default();
        match command {
            "start" => Some(Event::StartCmd),
            "cancel" => Some(Event::CancelCmd),
            "help" => Some(Event::HelpCmd),
            "review" => Some(Event::ReviewCmd),
            _ => None,
        }
    }
}

/// Keyboard change requested alongside a reply
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Keyboard {
    #[default]
    Unchanged,
    Buttons(Vec<Vec<String>>),
    Remove,
}

/// Message to send back to the submitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::Unchanged,
        }
    }

    pub fn with_buttons<I, S>(text: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<S>>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            keyboard: Keyboard::Buttons(
                rows.into_iter()
                    .map(|row| row.into_iter().map(Into::into).collect())
                    .collect(),
            ),
        }
    }

    pub fn removing_keyboard(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::Remove,
        }
    }
}

/// Work the caller must perform after applying a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Hand the accumulated submission to the fan-out coordinator
    Finalize(PartialSubmission),
    /// List recent submissions from the journal
    Review,
}
