//! Submission data model
//!
//! A submission is built up field by field during the dialogue as a
//! [`PartialSubmission`] and frozen into a [`Submission`] when the
//! submitter confirms.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp format used in ledger rows, reports and journal entries
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of intake being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionType {
    Inbound,
    Outbound,
    GeneralActivity,
}

impl SubmissionType {
    pub const ALL: [SubmissionType; 3] = [
        SubmissionType::Inbound,
        SubmissionType::Outbound,
        SubmissionType::GeneralActivity,
    ];

    /// Button label shown to the submitter
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionType::Inbound => "Inbound",
            SubmissionType::Outbound => "Outbound",
            SubmissionType::GeneralActivity => "GeneralActivity",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label.trim())
    }

    pub fn requires_activity(&self) -> bool {
        matches!(self, SubmissionType::GeneralActivity)
    }
}

impl fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Standard activity labels offered for general activity submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    Picking,
    Packing,
    Marking,
    Location,
    Stamping,
    Labelling,
    Others,
}

impl Activity {
    pub const ALL: [Activity; 7] = [
        Activity::Picking,
        Activity::Packing,
        Activity::Marking,
        Activity::Location,
        Activity::Stamping,
        Activity::Labelling,
        Activity::Others,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Activity::Picking => "Picking",
            Activity::Packing => "Packing",
            Activity::Marking => "Marking",
            Activity::Location => "Location",
            Activity::Stamping => "Stamping",
            Activity::Labelling => "Labelling",
            Activity::Others => "Others",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.label() == label.trim())
    }
}

/// Identity of the person driving a dialogue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Submitter {
    pub id: i64,
    pub full_name: String,
    pub username: Option<String>,
}

impl Submitter {
    pub fn new(id: i64, full_name: impl Into<String>, username: Option<String>) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            username,
        }
    }
}

impl fmt::Display for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(username) => write!(f, "{} (@{})", self.full_name, username),
            None => f.write_str(&self.full_name),
        }
    }
}

/// Opaque reference to a photo held by the chat transport
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoHandle(String);

impl PhotoHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsed reference/quantity/notes block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Details {
    pub reference: String,
    pub quantity: String,
    pub notes: String,
}

/// Fields accumulated while the dialogue is in progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialSubmission {
    pub submission_type: Option<SubmissionType>,
    pub activity: Option<String>,
    pub details: Option<Details>,
    pub photos: Vec<PhotoHandle>,
}

impl PartialSubmission {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Freeze the accumulated fields.
    ///
    /// Fails when any field the finalize pipeline relies on is missing.
    pub fn complete(
        &self,
        submitter: Submitter,
        timestamp: DateTime<Local>,
    ) -> crate::Result<Submission> {
        let submission_type = self
            .submission_type
            .ok_or_else(|| crate::IntakeError::validation("submission type not selected"))?;
        let details = self
            .details
            .as_ref()
            .ok_or_else(|| crate::IntakeError::validation("details not received"))?;
        if self.photos.is_empty() {
            return Err(crate::IntakeError::validation("no photos received"));
        }
        let activity = match (submission_type.requires_activity(), &self.activity) {
            (true, Some(label)) => Some(label.clone()),
            (true, None) => {
                return Err(crate::IntakeError::validation("activity not selected"));
            }
            (false, _) => None,
        };

        Ok(Submission {
            submission_type,
            activity,
            reference: details.reference.clone(),
            quantity: details.quantity.clone(),
            notes: details.notes.clone(),
            photos: self.photos.clone(),
            submitter,
            timestamp,
        })
    }
}

/// A completed intake record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub submission_type: SubmissionType,
    pub activity: Option<String>,
    pub reference: String,
    pub quantity: String,
    pub notes: String,
    pub photos: Vec<PhotoHandle>,
    pub submitter: Submitter,
    pub timestamp: DateTime<Local>,
}

impl Submission {
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Timestamp safe for use inside file names
    pub fn file_timestamp(&self) -> String {
        self.formatted_timestamp().replace(':', "-")
    }
}
