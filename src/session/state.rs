//! Dialogue stages and per-submitter session state

use crate::submission::PartialSubmission;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named point in the intake dialogue
///
/// `Idle` stands for both "no dialogue yet" and "dialogue finished"; a
/// session in that stage is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    SelectType,
    SelectActivity,
    CollectOtherActivityLabel,
    AwaitingData,
    Confirm,
}

impl Stage {
    /// Check if this stage ends the dialogue
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Idle)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::SelectType => "select-type",
            Stage::SelectActivity => "select-activity",
            Stage::CollectOtherActivityLabel => "collect-other-activity",
            Stage::AwaitingData => "awaiting-data",
            Stage::Confirm => "confirm",
        };
        f.write_str(name)
    }
}

/// One submitter's in-flight dialogue
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub stage: Stage,
    pub partial: PartialSubmission,
}

impl SessionState {
    /// Fresh session at the type selection prompt
    pub fn started() -> Self {
        Self {
            stage: Stage::SelectType,
            partial: PartialSubmission::default(),
        }
    }

    pub fn details_received(&self) -> bool {
        self.partial.details.is_some()
    }

    pub fn photo_count(&self) -> usize {
        self.partial.photos.len()
    }

    /// Same data, different stage
    pub fn at(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }
}
