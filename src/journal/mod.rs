//! Submission journal
//!
//! Every finalized submission is appended to a journal that is opened at
//! process start and flushed and closed at shutdown. The review command
//! reads recent entries back.

use crate::fanout::FinalizeReport;
use crate::submission::{PhotoHandle, SubmissionType};
use crate::{IntakeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use uuid::Uuid;

/// One finalized submission as kept in the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub timestamp: String,
    pub submission_type: SubmissionType,
    pub activity: Option<String>,
    pub reference: String,
    pub submitter: String,
    pub photos: Vec<PhotoHandle>,
    pub links: Vec<String>,
    pub report: String,
    pub failed_sinks: Vec<String>,
}

impl JournalEntry {
    pub fn from_report(report: &FinalizeReport) -> Self {
        let submission = &report.submission;
        Self {
            id: Uuid::new_v4(),
            timestamp: submission.formatted_timestamp(),
            submission_type: submission.submission_type,
            activity: submission.activity.clone(),
            reference: submission.reference.clone(),
            submitter: submission.submitter.to_string(),
            photos: submission.photos.clone(),
            links: report.links.clone(),
            report: report.report_text.clone(),
            failed_sinks: report
                .failures()
                .map(|r| r.sink.to_string())
                .collect(),
        }
    }

    /// One-line summary for the review listing
    pub fn summary_line(&self) -> String {
        let kind = match &self.activity {
            Some(activity) => format!("{} ({})", self.submission_type, activity),
            None => self.submission_type.to_string(),
        };
        format!(
            "{} | {} | {} | {} photo(s)",
            self.timestamp,
            self.reference,
            kind,
            self.photos.len()
        )
    }
}

/// Storage for finalized submissions with an explicit lifecycle
#[async_trait]
pub trait SubmissionJournal: Send + Sync {
    async fn open(&self) -> Result<()>;

    async fn record(&self, entry: JournalEntry) -> Result<()>;

    /// Most recent entries, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>>;

    async fn flush(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// JSON-lines journal file
pub struct JsonlJournal {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl JsonlJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl SubmissionJournal for JsonlJournal {
    async fn open(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        if writer.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        *writer = Some(BufWriter::new(file));
        Ok(())
    }

    async fn record(&self, entry: JournalEntry) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| IntakeError::transport("journal", "journal is not open"))?;
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        self.flush().await?;
        if !fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).await?;
        let mut entries = Vec::new();
        for line in content.lines().rev() {
            if entries.len() >= limit {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping unreadable journal line: {}", e),
            }
        }
        Ok(entries)
    }

    async fn flush(&self) -> Result<()> {
        if let Some(writer) = self.writer.lock().await.as_mut() {
            writer.flush().await?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.writer.lock().await;
        if let Some(mut writer) = guard.take() {
            writer.flush().await?;
            writer.into_inner().sync_all().await?;
        }
        Ok(())
    }
}

/// Journal kept in memory
#[derive(Clone, Default)]
pub struct MemoryJournal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl SubmissionJournal for MemoryJournal {
    async fn open(&self) -> Result<()> {
        Ok(())
    }

    async fn record(&self, entry: JournalEntry) -> Result<()> {
        self.entries.lock().await.push(entry);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
