//! Conversation state machine
//!
//! Events from the chat transport are turned into session transitions,
//! replies for the submitter and, on confirmation, a finalize effect.

pub mod events;
pub mod machine;
pub mod messages;

pub use events::{Effect, Event, EventKind, Keyboard, Reply};
pub use machine::{step, Transition};
