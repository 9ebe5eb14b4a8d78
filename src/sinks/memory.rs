//! In-memory sink implementations
//!
//! Used by tests and dry runs. Each double records the calls it receives
//! and can be told to fail so partial-failure handling can be exercised.

use super::{EmailMessage, FolderEntry, Ledger, Mailer, Notifier, ObjectStore, PhotoSource};
use crate::submission::PhotoHandle;
use crate::{IntakeError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFolder {
    pub id: String,
    pub name: String,
    pub parent: Option<String>,
    pub trashed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFile {
    pub folder_id: String,
    pub name: String,
    pub mime_type: String,
    pub size: usize,
}

#[derive(Default)]
struct ObjectStoreState {
    folders: Vec<MemoryFolder>,
    files: Vec<MemoryFile>,
    create_calls: usize,
    failure: Option<String>,
    failing_files: HashSet<String>,
}

/// Object store held in memory
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    state: Arc<Mutex<ObjectStoreState>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a folder directly, bypassing the create counter
    pub async fn insert_folder(&self, name: &str, parent: Option<&str>, trashed: bool) -> String {
        let mut state = self.state.lock().await;
        let id = format!("folder-{}", state.folders.len() + 1);
        state.folders.push(MemoryFolder {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.map(str::to_string),
            trashed,
        });
        id
    }

    /// Make every call fail with `message`
    pub async fn fail_with(&self, message: &str) {
        self.state.lock().await.failure = Some(message.to_string());
    }

    /// Make uploads of files whose name starts with `prefix` fail
    pub async fn fail_uploads_starting_with(&self, prefix: &str) {
        self.state
            .lock()
            .await
            .failing_files
            .insert(prefix.to_string());
    }

    pub async fn create_calls(&self) -> usize {
        self.state.lock().await.create_calls
    }

    pub async fn folders(&self) -> Vec<MemoryFolder> {
        self.state.lock().await.folders.clone()
    }

    pub async fn files(&self) -> Vec<MemoryFile> {
        self.state.lock().await.files.clone()
    }

    /// Live folders with `name`, in creation order
    pub async fn folders_named(&self, name: &str) -> Vec<MemoryFolder> {
        self.state
            .lock()
            .await
            .folders
            .iter()
            .filter(|f| f.name == name && !f.trashed)
            .cloned()
            .collect()
    }

    async fn check(&self) -> Result<()> {
        match &self.state.lock().await.failure {
            Some(message) => Err(IntakeError::transport("storage", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn find_folders(&self, name: &str, parent: Option<&str>) -> Result<Vec<FolderEntry>> {
        self.check().await?;
        let found: Vec<FolderEntry> = self
            .state
            .lock()
            .await
            .folders
            .iter()
            .filter(|f| f.name == name && f.parent.as_deref() == parent && !f.trashed)
            .map(|f| FolderEntry {
                id: f.id.clone(),
                name: f.name.clone(),
            })
            .collect();
        // Give concurrent finalizers a chance to interleave between the
        // lookup and the create, like a remote backend would
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String> {
        self.check().await?;
        let mut state = self.state.lock().await;
        state.create_calls += 1;
        let id = format!("folder-{}", state.folders.len() + 1);
        state.folders.push(MemoryFolder {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.map(str::to_string),
            trashed: false,
        });
        Ok(id)
    }

    async fn upload_file(
        &self,
        folder_id: &str,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        self.check().await?;
        let mut state = self.state.lock().await;
        if state
            .failing_files
            .iter()
            .any(|prefix| file_name.starts_with(prefix.as_str()))
        {
            return Err(IntakeError::transport(
                "storage",
                format!("upload of {file_name} rejected"),
            ));
        }
        if !state.folders.iter().any(|f| f.id == folder_id) {
            return Err(IntakeError::transport(
                "storage",
                format!("folder {folder_id} does not exist"),
            ));
        }
        state.files.push(MemoryFile {
            folder_id: folder_id.to_string(),
            name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len(),
        });
        Ok(format!("memory://{folder_id}/{file_name}"))
    }
}

#[derive(Default)]
struct LedgerState {
    sheets: HashMap<String, Vec<Vec<String>>>,
    create_calls: usize,
    failure: Option<String>,
}

/// Ledger held in memory; row 0 of each sheet is its header
#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_with(&self, message: &str) {
        self.state.lock().await.failure = Some(message.to_string());
    }

    pub async fn rows(&self, sheet: &str) -> Vec<Vec<String>> {
        self.state
            .lock()
            .await
            .sheets
            .get(sheet)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn create_calls(&self) -> usize {
        self.state.lock().await.create_calls
    }

    async fn check(&self) -> Result<()> {
        match &self.state.lock().await.failure {
            Some(message) => Err(IntakeError::transport("ledger", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn sheet_exists(&self, sheet: &str) -> Result<bool> {
        self.check().await?;
        let exists = self.state.lock().await.sheets.contains_key(sheet);
        tokio::task::yield_now().await;
        Ok(exists)
    }

    async fn create_sheet(&self, sheet: &str, header: &[&str]) -> Result<()> {
        self.check().await?;
        let mut state = self.state.lock().await;
        state.create_calls += 1;
        state
            .sheets
            .entry(sheet.to_string())
            .or_insert_with(|| vec![header.iter().map(|h| h.to_string()).collect()]);
        Ok(())
    }

    async fn append_row(&self, sheet: &str, row: &[String]) -> Result<()> {
        self.check().await?;
        let mut state = self.state.lock().await;
        let rows = state.sheets.get_mut(sheet).ok_or_else(|| {
            IntakeError::transport("ledger", format!("sheet '{sheet}' does not exist"))
        })?;
        rows.push(row.to_vec());
        Ok(())
    }
}

/// Mailer that keeps every message it is asked to send
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_with(&self, message: &str) {
        *self.failure.lock().await = Some(message.to_string());
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if let Some(failure) = self.failure.lock().await.as_ref() {
            return Err(IntakeError::transport("email", failure));
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// Message posted to the group chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostedMessage {
    Album {
        photos: Vec<PhotoHandle>,
        caption: Option<String>,
    },
    Text(String),
}

/// Notifier that keeps every post
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    posts: Arc<Mutex<Vec<PostedMessage>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_with(&self, message: &str) {
        *self.failure.lock().await = Some(message.to_string());
    }

    pub async fn posts(&self) -> Vec<PostedMessage> {
        self.posts.lock().await.clone()
    }

    async fn check(&self) -> Result<()> {
        match self.failure.lock().await.as_ref() {
            Some(failure) => Err(IntakeError::transport("notification", failure)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_album(&self, photos: &[PhotoHandle], caption: Option<&str>) -> Result<()> {
        self.check().await?;
        self.posts.lock().await.push(PostedMessage::Album {
            photos: photos.to_vec(),
            caption: caption.map(str::to_string),
        });
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.check().await?;
        self.posts
            .lock()
            .await
            .push(PostedMessage::Text(text.to_string()));
        Ok(())
    }
}

/// Photo source that answers with the handle's own bytes
#[derive(Clone, Default)]
pub struct MemoryPhotoSource {
    missing: Arc<Mutex<HashSet<PhotoHandle>>>,
}

impl MemoryPhotoSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn mark_missing(&self, photo: &PhotoHandle) {
        self.missing.lock().await.insert(photo.clone());
    }
}

#[async_trait]
impl PhotoSource for MemoryPhotoSource {
    async fn fetch(&self, photo: &PhotoHandle) -> Result<Vec<u8>> {
        if self.missing.lock().await.contains(photo) {
            return Err(IntakeError::transport(
                "photos",
                format!("photo {photo} is no longer available"),
            ));
        }
        Ok(photo.as_str().as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_hides_trashed_and_foreign_parents() {
        let store = MemoryObjectStore::new();
        let root = store.insert_folder("root", None, false).await;
        store.insert_folder("CNT1", Some(&root), true).await;
        store.insert_folder("CNT1", None, false).await;

        assert!(store.find_folders("CNT1", Some(&root)).await.unwrap().is_empty());
        assert_eq!(store.find_folders("CNT1", None).await.unwrap().len(), 1);
        assert_eq!(store.create_calls().await, 0);
    }

    #[tokio::test]
    async fn test_memory_ledger_create_is_conditional() {
        let ledger = MemoryLedger::new();
        ledger.create_sheet("S", &["a"]).await.unwrap();
        ledger.create_sheet("S", &["b"]).await.unwrap();
        assert_eq!(ledger.rows("S").await, vec![vec!["a".to_string()]]);
        assert_eq!(ledger.create_calls().await, 2);
    }

    #[tokio::test]
    async fn test_recording_doubles_fail_on_request() {
        let mailer = RecordingMailer::new();
        mailer.fail_with("smtp down").await;
        let message = EmailMessage {
            from: "a@b".to_string(),
            to: vec![],
            subject: "s".to_string(),
            html_body: String::new(),
        };
        assert!(mailer.send(&message).await.is_err());
        assert!(mailer.sent().await.is_empty());

        let notifier = RecordingNotifier::new();
        notifier.send_text("hi").await.unwrap();
        assert_eq!(notifier.posts().await, vec![PostedMessage::Text("hi".to_string())]);
    }
}
