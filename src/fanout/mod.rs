//! Fan-out of a finalized submission to every sink
//!
//! Sinks run one after another in a fixed order: photo upload, ledger
//! append, email, group notification. A failing sink is logged and reported
//! but never stops the ones after it. The only early exit is a missing
//! storage configuration, which aborts before anything is attempted.

pub mod report;

use crate::dialogue::Reply;
use crate::ledger::SheetRouter;
use crate::provision::{Provisioner, RootFolder};
use crate::retry::RetryPolicy;
use crate::sinks::{Mailer, Notifier, PhotoSource};
use crate::submission::Submission;
use crate::{IntakeError, Result};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Maximum photos per group-chat album
pub const ALBUM_SIZE: usize = 10;

pub const PHOTO_MIME_TYPE: &str = "image/jpeg";

/// Longest caption the group chat accepts on a photo, in characters
pub const CAPTION_LIMIT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkName {
    Storage,
    Ledger,
    Email,
    Notification,
}

impl fmt::Display for SinkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SinkName::Storage => "storage",
            SinkName::Ledger => "ledger",
            SinkName::Email => "email",
            SinkName::Notification => "notification",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Delivered,
    /// The sink was attempted and failed; holds the raw error text
    Failed(String),
    /// The sink is not configured
    Skipped(String),
}

/// Outcome of one sink for one finalize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkResult {
    pub sink: SinkName,
    pub outcome: SinkOutcome,
}

impl SinkResult {
    fn delivered(sink: SinkName) -> Self {
        Self {
            sink,
            outcome: SinkOutcome::Delivered,
        }
    }

    fn failed(sink: SinkName, detail: impl fmt::Display) -> Self {
        Self {
            sink,
            outcome: SinkOutcome::Failed(detail.to_string()),
        }
    }

    fn skipped(sink: SinkName, reason: impl Into<String>) -> Self {
        Self {
            sink,
            outcome: SinkOutcome::Skipped(reason.into()),
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, SinkOutcome::Delivered)
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.outcome {
            SinkOutcome::Failed(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Everything that happened during one finalize
#[derive(Debug, Clone)]
pub struct FinalizeReport {
    pub submission: Submission,
    pub results: Vec<SinkResult>,
    /// Links of the photos that uploaded, in photo order
    pub links: Vec<String>,
    pub report_text: String,
    pub sheet: Option<String>,
}

impl FinalizeReport {
    pub fn result(&self, sink: SinkName) -> Option<&SinkResult> {
        self.results.iter().find(|r| r.sink == sink)
    }

    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SinkResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, SinkOutcome::Failed(_)))
    }

    /// Messages for the submitter: the completion notice followed by one
    /// warning per failed sink
    pub fn acknowledgments(&self) -> Vec<Reply> {
        let mut replies = vec![Reply::text("Submission complete!")];
        for failure in self.failures() {
            let detail = failure.error_detail().unwrap_or_default();
            let text = match failure.sink {
                SinkName::Storage => format!(
                    "Warning: some photos could not be uploaded to storage. Please notify an admin.\n\nError details: {detail}"
                ),
                SinkName::Ledger => format!(
                    "Warning: the submission could not be added to the ledger. Please notify an admin.\n\nError details: {detail}"
                ),
                SinkName::Email => {
                    format!("Note: the email notification could not be sent ({detail}).")
                }
                SinkName::Notification => format!(
                    "Warning: the report could not be posted to the operations group.\n\nError details: {detail}"
                ),
            };
            replies.push(Reply::text(text));
        }
        replies
    }
}

/// Email sink settings
#[derive(Clone)]
pub struct MailRoute {
    pub mailer: Arc<dyn Mailer>,
    pub from: String,
    pub to: Vec<String>,
}

pub struct FanoutCoordinator {
    provisioner: Option<Provisioner>,
    root: RootFolder,
    photos: Arc<dyn PhotoSource>,
    sheets: Option<SheetRouter>,
    mail: Option<MailRoute>,
    notifier: Option<Arc<dyn Notifier>>,
    retry: RetryPolicy,
    album_size: usize,
}

impl FanoutCoordinator {
    pub fn builder(photos: Arc<dyn PhotoSource>, root: RootFolder) -> FanoutBuilder {
        FanoutBuilder {
            coordinator: FanoutCoordinator {
                provisioner: None,
                root,
                photos,
                sheets: None,
                mail: None,
                notifier: None,
                retry: RetryPolicy::default(),
                album_size: ALBUM_SIZE,
            },
        }
    }

    /// Deliver a submission to every sink.
    ///
    /// Returns `Err` only for a configuration problem that prevents storage
    /// provisioning; in that case no sink has been touched.
    pub async fn finalize(&self, submission: Submission) -> Result<FinalizeReport> {
        let provisioner = self.provisioner.as_ref().ok_or_else(|| {
            IntakeError::configuration("no storage location is configured for photo uploads")
        })?;

        info!(
            "Finalizing {} submission {} from {} with {} photo(s)",
            submission.submission_type,
            submission.reference,
            submission.submitter,
            submission.photos.len()
        );

        let mut results = Vec::with_capacity(4);

        let (storage, links) = self.upload_photos(provisioner, &submission).await?;
        results.push(storage);

        let (ledger, sheet) = self.append_ledger(&submission, &links).await;
        results.push(ledger);

        results.push(self.send_email(&submission, &links).await);

        let report_text = report::report_text(&submission);
        results.push(self.notify(&submission, &report_text).await);

        let report = FinalizeReport {
            submission,
            results,
            links,
            report_text,
            sheet,
        };
        info!(
            "Finalized {}: {}/{} sinks delivered",
            report.submission.reference,
            report.successes(),
            report.results.len()
        );
        Ok(report)
    }

    async fn upload_photos(
        &self,
        provisioner: &Provisioner,
        submission: &Submission,
    ) -> Result<(SinkResult, Vec<String>)> {
        let folder = match provisioner.provision(&self.root, &submission.reference).await {
            Ok(folder) => folder,
            Err(e @ IntakeError::Configuration(_)) => return Err(e),
            Err(e) => {
                error!(
                    "Failed to provision storage for {}: {}",
                    submission.reference, e
                );
                return Ok((SinkResult::failed(SinkName::Storage, e), Vec::new()));
            }
        };

        let store = provisioner.store();
        let stamp = submission.file_timestamp();
        let mut links = Vec::with_capacity(submission.photos.len());
        let mut failures = Vec::new();

        for (index, photo) in submission.photos.iter().enumerate() {
            let file_name = format!("photo_{}_{}.jpg", index + 1, stamp);
            let uploaded = self
                .retry
                .run(&format!("upload {file_name}"), || async {
                    let bytes = self.photos.fetch(photo).await?;
                    store
                        .upload_file(&folder.reference_folder_id, &file_name, PHOTO_MIME_TYPE, bytes)
                        .await
                })
                .await;

            match uploaded {
                Ok(link) => links.push(link),
                Err(e) => {
                    error!("Failed to upload {} for {}: {}", file_name, submission.reference, e);
                    failures.push(format!("photo {}: {}", index + 1, e));
                }
            }
        }

        let result = if failures.is_empty() {
            info!(
                "Uploaded {} photo(s) for {}",
                links.len(),
                submission.reference
            );
            SinkResult::delivered(SinkName::Storage)
        } else {
            SinkResult::failed(
                SinkName::Storage,
                format!(
                    "{} of {} photo(s) failed: {}",
                    failures.len(),
                    submission.photos.len(),
                    failures.join("; ")
                ),
            )
        };
        Ok((result, links))
    }

    async fn append_ledger(
        &self,
        submission: &Submission,
        links: &[String],
    ) -> (SinkResult, Option<String>) {
        let Some(sheets) = &self.sheets else {
            warn!("Ledger is not configured; skipping");
            return (
                SinkResult::skipped(SinkName::Ledger, "ledger not configured"),
                None,
            );
        };

        match sheets.record(submission, links).await {
            Ok(sheet) => {
                info!("Ledger sheet '{}' updated for {}", sheet, submission.reference);
                (SinkResult::delivered(SinkName::Ledger), Some(sheet))
            }
            Err(e) => {
                error!("Failed to update ledger for {}: {}", submission.reference, e);
                (SinkResult::failed(SinkName::Ledger, e), None)
            }
        }
    }

    async fn send_email(&self, submission: &Submission, links: &[String]) -> SinkResult {
        let Some(route) = &self.mail else {
            warn!("Email transport is not configured; skipping email");
            return SinkResult::skipped(SinkName::Email, "email transport not configured");
        };

        let sent = match report::compose_email(submission, links, &route.from, &route.to) {
            Ok(message) => {
                self.retry
                    .run("send email", || route.mailer.send(&message))
                    .await
            }
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => {
                info!("Email sent for {}", submission.reference);
                SinkResult::delivered(SinkName::Email)
            }
            Err(e) => {
                warn!("Email for {} not sent: {}", submission.reference, e);
                SinkResult::failed(SinkName::Email, e)
            }
        }
    }

    async fn notify(&self, submission: &Submission, report_text: &str) -> SinkResult {
        let Some(notifier) = &self.notifier else {
            warn!("Group notification is not configured; skipping");
            return SinkResult::skipped(SinkName::Notification, "notification not configured");
        };

        let sent = if submission.photos.is_empty() {
            self.retry
                .run("post report", || notifier.send_text(report_text))
                .await
        } else {
            self.post_albums(notifier.as_ref(), submission, report_text)
                .await
        };

        match sent {
            Ok(()) => {
                info!("Report posted for {}", submission.reference);
                SinkResult::delivered(SinkName::Notification)
            }
            Err(e) => {
                error!("Failed to post report for {}: {}", submission.reference, e);
                SinkResult::failed(SinkName::Notification, e)
            }
        }
    }

    async fn post_albums(
        &self,
        notifier: &dyn Notifier,
        submission: &Submission,
        report_text: &str,
    ) -> Result<()> {
        // A report too long for a caption goes out as its own message first
        let fits = report_text.chars().count() <= CAPTION_LIMIT;
        if !fits {
            self.retry
                .run("post report", || notifier.send_text(report_text))
                .await?;
        }

        for (batch, photos) in submission.photos.chunks(self.album_size.max(1)).enumerate() {
            let caption = (fits && batch == 0).then_some(report_text);
            self.retry
                .run(&format!("post album {}", batch + 1), || {
                    notifier.send_album(photos, caption)
                })
                .await?;
        }
        Ok(())
    }
}

/// Builder for [`FanoutCoordinator`]; sinks left unset are skipped, except
/// storage whose absence aborts every finalize
pub struct FanoutBuilder {
    coordinator: FanoutCoordinator,
}

impl FanoutBuilder {
    pub fn provisioner(mut self, provisioner: Provisioner) -> Self {
        self.coordinator.provisioner = Some(provisioner);
        self
    }

    pub fn sheets(mut self, sheets: SheetRouter) -> Self {
        self.coordinator.sheets = Some(sheets);
        self
    }

    pub fn mail(mut self, route: MailRoute) -> Self {
        self.coordinator.mail = Some(route);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.coordinator.notifier = Some(notifier);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.coordinator.retry = retry;
        self
    }

    pub fn album_size(mut self, album_size: usize) -> Self {
        self.coordinator.album_size = album_size;
        self
    }

    pub fn build(self) -> FanoutCoordinator {
        self.coordinator
    }
}
