//! External sink abstractions
//!
//! Every destination a finalized submission is delivered to sits behind a
//! trait so the coordinator can be driven against real backends or the
//! in-memory doubles in [`memory`].

pub mod local;
pub mod mail;
pub mod memory;
pub mod telegram;

pub use local::{CsvLedger, FsPhotoSource, LocalFolderStore};
pub use mail::SpoolMailer;
pub use memory::{
    MemoryLedger, MemoryObjectStore, MemoryPhotoSource, RecordingMailer, RecordingNotifier,
};
pub use telegram::{TelegramNotifier, TelegramPhotoSource};

use crate::submission::PhotoHandle;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Folder returned by an object-store lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub id: String,
    pub name: String,
}

/// Hierarchical object storage (folders and files)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Non-trashed folders named exactly `name` directly under `parent`.
    /// `None` means the top level of the store.
    async fn find_folders(&self, name: &str, parent: Option<&str>) -> Result<Vec<FolderEntry>>;

    /// Create a folder and return its id
    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String>;

    /// Store a file in a folder and return a shareable link to it
    async fn upload_file(
        &self,
        folder_id: &str,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String>;
}

/// Tabular ledger made of named sheets
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn sheet_exists(&self, sheet: &str) -> Result<bool>;

    /// Create a sheet whose first row is `header`. Creating a sheet that
    /// already exists must leave it untouched.
    async fn create_sheet(&self, sheet: &str, header: &[&str]) -> Result<()>;

    async fn append_row(&self, sheet: &str, row: &[String]) -> Result<()>;
}

/// Outgoing email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Operational group-chat channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post one album. `caption` goes on the first photo only.
    async fn send_album(&self, photos: &[PhotoHandle], caption: Option<&str>) -> Result<()>;

    async fn send_text(&self, text: &str) -> Result<()>;
}

/// Resolves photo handles to image bytes
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn fetch(&self, photo: &PhotoHandle) -> Result<Vec<u8>>;
}

/// Replace characters that cannot appear in a single path component
pub(crate) fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
