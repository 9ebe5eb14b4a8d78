//! Sheet routing for the tabular ledger
//!
//! Each submission type has its own sheet with a fixed header. Sheets are
//! created lazily the first time a submission of that type is recorded;
//! afterwards rows are only appended.

use crate::locks::KeyedLocks;
use crate::retry::RetryPolicy;
use crate::sinks::Ledger;
use crate::submission::{Submission, SubmissionType};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Header for the inbound and outbound sheets
pub const MOVEMENT_HEADER: [&str; 9] = [
    "Timestamp",
    "Submitted By",
    "Container/PO Number",
    "Number of Pallets/Carton",
    "Damage Notes/Remarks",
    "Photo Link",
    "Additional Photo Link",
    "Additional Photo Links",
    "Reserved",
];

/// Header for the general activity sheet
pub const ACTIVITY_HEADER: [&str; 9] = [
    "Timestamp",
    "Submitted By",
    "Container/PO Number",
    "Activity",
    "Quantity & Remarks",
    "Photo Link",
    "Additional Photo Link",
    "Additional Photo Links",
    "All Photo Links",
];

/// Sheet names per submission type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub inbound: String,
    pub outbound: String,
    pub general_activity: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            inbound: "Inbound".to_string(),
            outbound: "Outbound".to_string(),
            general_activity: "General Activity".to_string(),
        }
    }
}

/// Destination sheet and its header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub name: String,
    pub header: &'static [&'static str],
}

pub struct SheetRouter {
    ledger: Arc<dyn Ledger>,
    names: SheetNames,
    locks: KeyedLocks,
    retry: RetryPolicy,
}

impl SheetRouter {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        names: SheetNames,
        locks: KeyedLocks,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            ledger,
            names,
            locks,
            retry,
        }
    }

    /// Pick the sheet for a submission type.
    ///
    /// All general activities share one sheet; the activity label is a
    /// column there.
    pub fn route(&self, submission_type: SubmissionType) -> SheetLayout {
        match submission_type {
            SubmissionType::Inbound => SheetLayout {
                name: self.names.inbound.clone(),
                header: &MOVEMENT_HEADER,
            },
            SubmissionType::Outbound => SheetLayout {
                name: self.names.outbound.clone(),
                header: &MOVEMENT_HEADER,
            },
            SubmissionType::GeneralActivity => SheetLayout {
                name: self.names.general_activity.clone(),
                header: &ACTIVITY_HEADER,
            },
        }
    }

    /// Create the sheet with its header unless it already exists
    pub async fn ensure_sheet(&self, layout: &SheetLayout) -> Result<()> {
        let _guard = self.locks.lock(&format!("sheet:{}", layout.name)).await;
        let exists = self
            .retry
            .run(&format!("check sheet '{}'", layout.name), || {
                self.ledger.sheet_exists(&layout.name)
            })
            .await?;
        if !exists {
            self.retry
                .run(&format!("create sheet '{}'", layout.name), || {
                    self.ledger.create_sheet(&layout.name, layout.header)
                })
                .await?;
            info!("Created ledger sheet '{}'", layout.name);
        }
        Ok(())
    }

    /// Append one row for the submission; returns the sheet name
    pub async fn record(&self, submission: &Submission, links: &[String]) -> Result<String> {
        let layout = self.route(submission.submission_type);
        self.ensure_sheet(&layout).await?;

        let row = build_row(submission, links);
        self.retry
            .run(&format!("append to sheet '{}'", layout.name), || {
                self.ledger.append_row(&layout.name, &row)
            })
            .await?;
        Ok(layout.name)
    }
}

/// Build a ledger row. The first two links get their own columns, the rest
/// are newline-joined into a third.
pub fn build_row(submission: &Submission, links: &[String]) -> Vec<String> {
    let first = links.first().cloned().unwrap_or_default();
    let second = links.get(1).cloned().unwrap_or_default();
    let rest = links.get(2..).map(|r| r.join("\n")).unwrap_or_default();

    match submission.submission_type {
        SubmissionType::Inbound | SubmissionType::Outbound => vec![
            submission.formatted_timestamp(),
            submission.submitter.to_string(),
            submission.reference.clone(),
            submission.quantity.clone(),
            submission.notes.clone(),
            first,
            second,
            rest,
            String::new(),
        ],
        SubmissionType::GeneralActivity => vec![
            submission.formatted_timestamp(),
            submission.submitter.to_string(),
            submission.reference.clone(),
            submission.activity.clone().unwrap_or_default(),
            format!("Qty: {}; Notes: {}", submission.quantity, submission.notes),
            first,
            second,
            rest,
            links.join("\n"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::MemoryLedger;
    use crate::submission::{PhotoHandle, Submitter};
    use chrono::{Local, TimeZone};

    fn submission(submission_type: SubmissionType, activity: Option<&str>) -> Submission {
        Submission {
            submission_type,
            activity: activity.map(str::to_string),
            reference: "CNT123".to_string(),
            quantity: "5".to_string(),
            notes: "None".to_string(),
            photos: vec![PhotoHandle::new("p1"), PhotoHandle::new("p2")],
            submitter: Submitter::new(1, "Jo Tan", Some("jotan".to_string())),
            timestamp: Local.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap(),
        }
    }

    fn links(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("link{i}")).collect()
    }

    fn router(ledger: &MemoryLedger) -> SheetRouter {
        SheetRouter::new(
            Arc::new(ledger.clone()),
            SheetNames::default(),
            KeyedLocks::new(),
            RetryPolicy::immediate(),
        )
    }

    #[test]
    fn test_routing_by_type() {
        let r = router(&MemoryLedger::new());
        assert_eq!(r.route(SubmissionType::Inbound).name, "Inbound");
        assert_eq!(r.route(SubmissionType::Outbound).name, "Outbound");
        let activity = r.route(SubmissionType::GeneralActivity);
        assert_eq!(activity.name, "General Activity");
        assert_eq!(activity.header, &ACTIVITY_HEADER);
    }

    #[test]
    fn test_inbound_row_with_two_links() {
        let row = build_row(&submission(SubmissionType::Inbound, None), &links(2));
        assert_eq!(
            row,
            vec![
                "2025-03-04 09:30:00",
                "Jo Tan (@jotan)",
                "CNT123",
                "5",
                "None",
                "link1",
                "link2",
                "",
                ""
            ]
        );
    }

    #[test]
    fn test_extra_links_are_joined() {
        let row = build_row(&submission(SubmissionType::Outbound, None), &links(4));
        assert_eq!(row[5], "link1");
        assert_eq!(row[6], "link2");
        assert_eq!(row[7], "link3\nlink4");
    }

    #[test]
    fn test_activity_row() {
        let row = build_row(
            &submission(SubmissionType::GeneralActivity, Some("Re-labeling")),
            &links(3),
        );
        assert_eq!(row.len(), ACTIVITY_HEADER.len());
        assert_eq!(row[3], "Re-labeling");
        assert_eq!(row[4], "Qty: 5; Notes: None");
        assert_eq!(row[7], "link3");
        assert_eq!(row[8], "link1\nlink2\nlink3");
    }

    #[test]
    fn test_row_without_links() {
        let row = build_row(&submission(SubmissionType::Inbound, None), &[]);
        assert_eq!(&row[5..], &["", "", "", ""]);
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let ledger = MemoryLedger::new();
        let r = router(&ledger);
        let s = submission(SubmissionType::Inbound, None);
        r.record(&s, &links(1)).await.unwrap();
        r.record(&s, &links(1)).await.unwrap();

        let rows = ledger.rows("Inbound").await;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], MOVEMENT_HEADER.to_vec());
        assert_eq!(ledger.create_calls().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_writes_create_sheet_once() {
        let ledger = MemoryLedger::new();
        let r = Arc::new(router(&ledger));
        let s = submission(SubmissionType::GeneralActivity, Some("Packing"));

        let (l1, l2) = (links(1), links(2));
        let (a, b) = tokio::join!(r.record(&s, &l1), r.record(&s, &l2));
        a.unwrap();
        b.unwrap();
        assert_eq!(ledger.create_calls().await, 1);
        assert_eq!(ledger.rows("General Activity").await.len(), 3);
    }
}
