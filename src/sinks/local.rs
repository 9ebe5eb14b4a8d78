//! Filesystem-backed sinks
//!
//! `LocalFolderStore` keeps the submission tree on disk, `CsvLedger` keeps
//! one CSV file per sheet and `FsPhotoSource` reads photos dropped into an
//! inbox directory.

use super::{sanitize_component, FolderEntry, Ledger, ObjectStore, PhotoSource};
use crate::submission::PhotoHandle;
use crate::{IntakeError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Marker file that hides a folder from lookups
pub const TRASHED_MARKER: &str = ".trashed";

/// Sidecar holding the exact folder name a directory was created for
pub const NAME_SIDECAR: &str = ".name";

/// Turn a folder name into a directory name without collisions.
///
/// `%` and the characters a path component cannot hold are written as
/// `%XX`, as is a leading `.`, so no encoded name can clash with a marker
/// file or with the `~N` suffix given to replacements of trashed folders.
fn encode_folder_name(name: &str) -> String {
    if name.is_empty() {
        return "%".to_string();
    }
    let mut encoded = String::with_capacity(name.len());
    for (i, c) in name.char_indices() {
        let escape = matches!(c, '%' | '/' | '\\' | ':' | '~')
            || c.is_control()
            || (i == 0 && c == '.');
        if escape {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                encoded.push_str(&format!("%{byte:02X}"));
            }
        } else {
            encoded.push(c);
        }
    }
    encoded
}

/// Object store rooted at a local directory
///
/// Folder ids are paths relative to the base directory, links are
/// `file://` URLs. Each folder records its name in a [`NAME_SIDECAR`] file
/// so lookups compare names exactly.
pub struct LocalFolderStore {
    base_dir: PathBuf,
}

impl LocalFolderStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn folder_path(&self, folder_id: Option<&str>) -> PathBuf {
        match folder_id {
            Some(id) if !id.is_empty() => self.base_dir.join(id),
            _ => self.base_dir.clone(),
        }
    }

    fn child_id(parent: Option<&str>, dir_name: &str) -> String {
        match parent {
            Some(p) if !p.is_empty() => format!("{p}/{dir_name}"),
            _ => dir_name.to_string(),
        }
    }

    /// Name a directory stands for: its sidecar, else the directory name
    async fn folder_name(path: &Path, dir_name: &str) -> String {
        match fs::read_to_string(path.join(NAME_SIDECAR)).await {
            Ok(name) => name,
            Err(_) => dir_name.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalFolderStore {
    async fn find_folders(&self, name: &str, parent: Option<&str>) -> Result<Vec<FolderEntry>> {
        let parent_path = self.folder_path(parent);
        let mut entries = match fs::read_dir(&parent_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let path = entry.path();
            if fs::try_exists(path.join(TRASHED_MARKER)).await? {
                continue;
            }
            let dir_name = entry.file_name().to_string_lossy().into_owned();
            if Self::folder_name(&path, &dir_name).await == name {
                found.push(FolderEntry {
                    id: Self::child_id(parent, &dir_name),
                    name: name.to_string(),
                });
            }
        }
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String> {
        let parent_path = self.folder_path(parent);
        fs::create_dir_all(&parent_path).await?;

        let base = encode_folder_name(name);
        let mut dir_name = base.clone();
        let mut attempt = 1;
        // An existing directory under this name is trashed or foreign; never reuse it
        loop {
            match fs::create_dir(parent_path.join(&dir_name)).await {
                Ok(()) => break,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                    dir_name = format!("{base}~{attempt}");
                }
                Err(e) => return Err(e.into()),
            }
        }

        fs::write(parent_path.join(&dir_name).join(NAME_SIDECAR), name).await?;
        Ok(Self::child_id(parent, &dir_name))
    }

    async fn upload_file(
        &self,
        folder_id: &str,
        file_name: &str,
        _mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let dir = self.folder_path(Some(folder_id));
        if !fs::try_exists(&dir).await? {
            return Err(IntakeError::transport(
                "storage",
                format!("folder {folder_id} does not exist"),
            ));
        }

        let path = dir.join(sanitize_component(file_name));
        fs::write(&path, bytes).await?;

        let absolute = fs::canonicalize(&path).await?;
        let link = Url::from_file_path(&absolute).map_err(|_| {
            IntakeError::transport("storage", format!("cannot link {}", absolute.display()))
        })?;
        Ok(link.to_string())
    }
}

/// Ledger stored as `<dir>/<sheet>.csv`
pub struct CsvLedger {
    dir: PathBuf,
}

impl CsvLedger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", sanitize_component(sheet)))
    }

    /// All rows of a sheet including the header
    pub async fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let content = fs::read(self.sheet_path(sheet)).await?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_slice());

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }
}

fn encode_record<I, S>(fields: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| IntakeError::transport("ledger", e.error()))
}

#[async_trait]
impl Ledger for CsvLedger {
    async fn sheet_exists(&self, sheet: &str) -> Result<bool> {
        Ok(fs::try_exists(self.sheet_path(sheet)).await?)
    }

    async fn create_sheet(&self, sheet: &str, header: &[&str]) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let record = encode_record(header)?;

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.sheet_path(sheet))
            .await;
        match file {
            Ok(mut file) => {
                file.write_all(&record).await?;
                file.flush().await?;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn append_row(&self, sheet: &str, row: &[String]) -> Result<()> {
        let path = self.sheet_path(sheet);
        if !fs::try_exists(&path).await? {
            return Err(IntakeError::transport(
                "ledger",
                format!("sheet '{sheet}' does not exist"),
            ));
        }

        let record = encode_record(row)?;
        let mut file = fs::OpenOptions::new().append(true).open(&path).await?;
        file.write_all(&record).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Photos stored as files; a handle is a path, relative ones resolve
/// against the inbox directory
pub struct FsPhotoSource {
    inbox: PathBuf,
}

impl FsPhotoSource {
    pub fn new(inbox: impl Into<PathBuf>) -> Self {
        Self {
            inbox: inbox.into(),
        }
    }

    fn resolve(&self, photo: &PhotoHandle) -> PathBuf {
        let path = Path::new(photo.as_str());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.inbox.join(path)
        }
    }
}

#[async_trait]
impl PhotoSource for FsPhotoSource {
    async fn fetch(&self, photo: &PhotoHandle) -> Result<Vec<u8>> {
        let path = self.resolve(photo);
        fs::read(&path).await.map_err(|e| {
            IntakeError::transport("photos", format!("cannot read {}: {e}", path.display()))
        })
    }
}
