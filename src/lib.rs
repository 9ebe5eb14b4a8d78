//! # uld-intake
//!
//! Guided intake of logistics submissions (inbound, outbound and general
//! warehouse activity) through a multi-turn chat dialogue, followed by a
//! fan-out of each confirmed submission to object storage, a tabular
//! ledger, email and a group-chat notification.
//!
//! ## Modules
//!
//! - `submission` - Submission data model
//! - `validation` - Parsing of the reference/quantity/notes block
//! - `session` - Per-submitter dialogue state
//! - `dialogue` - Events, replies and the transition table
//! - `sinks` - Sink traits with filesystem, HTTP and in-memory backends
//! - `provision` - Idempotent folder provisioning
//! - `ledger` - Sheet routing and row layout
//! - `fanout` - Finalize pipeline and its report
//! - `journal` - Log of finalized submissions
//! - `retry` - Timeouts and retries for external calls
//! - `locks` - Keyed async locks
//! - `bot` - Event handling per submitter
//! - `config` - TOML configuration with environment overrides
//! - `app` - Logging, bootstrap and the console driver
pub mod app;
pub mod bot;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod fanout;
pub mod journal;
pub mod ledger;
pub mod locks;
pub mod provision;
pub mod retry;
pub mod session;
pub mod sinks;
pub mod submission;
pub mod validation;

pub use error::{IntakeError, Result};
