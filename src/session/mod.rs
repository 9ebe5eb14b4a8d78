//! Session state management
//!
//! Holds each submitter's current dialogue stage and the partially filled
//! submission. Only the dialogue machine decides transitions; the store just
//! keeps the result.

pub mod state;
pub mod store;

pub use state::{SessionState, Stage};
pub use store::SessionStore;
