//! Intake bot
//!
//! Feeds chat events through the dialogue for each submitter and carries
//! out the effects the dialogue asks for. Events for one submitter are
//! handled strictly one after another; different submitters never wait on
//! each other except where finalize touches a shared external resource.

use crate::dialogue::{step, Effect, Event, Reply};
use crate::fanout::FanoutCoordinator;
use crate::journal::{JournalEntry, SubmissionJournal};
use crate::locks::KeyedLocks;
use crate::session::{SessionStore, Stage};
use crate::submission::{PartialSubmission, Submitter};
use crate::IntakeError;
use chrono::Local;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Entries listed by the review command
pub const DEFAULT_REVIEW_LIMIT: usize = 5;

pub struct IntakeBot {
    sessions: SessionStore,
    submitters: KeyedLocks,
    fanout: Arc<FanoutCoordinator>,
    journal: Arc<dyn SubmissionJournal>,
    review_limit: usize,
}

impl IntakeBot {
    pub fn new(fanout: Arc<FanoutCoordinator>, journal: Arc<dyn SubmissionJournal>) -> Self {
        Self {
            sessions: SessionStore::new(),
            submitters: KeyedLocks::new(),
            fanout,
            journal,
            review_limit: DEFAULT_REVIEW_LIMIT,
        }
    }

    pub fn with_review_limit(mut self, limit: usize) -> Self {
        self.review_limit = limit;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Current dialogue stage for a submitter
    pub async fn stage(&self, submitter_id: i64) -> Stage {
        self.sessions.stage(submitter_id).await
    }

    /// Handle one event and return the replies for the submitter, in order
    pub async fn handle(&self, submitter: &Submitter, event: Event) -> Vec<Reply> {
        let _turn = self
            .submitters
            .lock(&format!("submitter:{}", submitter.id))
            .await;

        let current = self.sessions.get(submitter.id).await;
        let transition = step(current, event);
        self.sessions.put(submitter.id, transition.next).await;

        let mut replies = transition.replies;
        match transition.effect {
            Some(Effect::Finalize(partial)) => {
                replies.extend(self.finalize(submitter, partial).await);
            }
            Some(Effect::Review) => replies.extend(self.review().await),
            None => {}
        }
        replies
    }

    async fn finalize(&self, submitter: &Submitter, partial: PartialSubmission) -> Vec<Reply> {
        let submission = match partial.complete(submitter.clone(), Local::now()) {
            Ok(submission) => submission,
            Err(e) => {
                error!("Cannot finalize submission from {}: {}", submitter, e);
                return vec![Reply::text(format!(
                    "The submission is incomplete and was not saved: {e}"
                ))];
            }
        };

        let report = match self.fanout.finalize(submission).await {
            Ok(report) => report,
            Err(e @ IntakeError::Configuration(_)) => {
                error!("Finalize aborted for {}: {}", submitter, e);
                return vec![Reply::text(format!(
                    "{e}. The submission was not saved. Please notify an admin."
                ))];
            }
            Err(e) => {
                error!("Finalize failed for {}: {}", submitter, e);
                return vec![Reply::text(format!(
                    "The submission could not be processed: {e}"
                ))];
            }
        };

        if let Err(e) = self.journal.record(JournalEntry::from_report(&report)).await {
            warn!(
                "Failed to journal submission {}: {}",
                report.submission.reference, e
            );
        }
        info!(
            "Submission {} from {} complete with {} failed sink(s)",
            report.submission.reference,
            submitter,
            report.failures().count()
        );
        report.acknowledgments()
    }

    async fn review(&self) -> Vec<Reply> {
        match self.journal.recent(self.review_limit).await {
            Ok(entries) if entries.is_empty() => {
                vec![Reply::text("No submissions have been recorded yet.")]
            }
            Ok(entries) => {
                debug!("Listing {} recent submission(s)", entries.len());
                let mut text = String::from("Recent submissions:\n");
                for entry in &entries {
                    text.push('\n');
                    text.push_str(&entry.summary_line());
                }
                vec![Reply::text(text)]
            }
            Err(e) => {
                error!("Failed to read the submission journal: {}", e);
                vec![Reply::text(format!(
                    "Recent submissions are not available: {e}"
                ))]
            }
        }
    }
}
