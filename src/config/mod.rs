//! Configuration loading
//!
//! `IntakeConfig` is read from a TOML file and then overridden from
//! `ULD_INTAKE_*` environment variables. Every section is optional; sinks
//! whose section is incomplete are left out of the fan-out, except storage
//! whose absence is reported when a submission is finalized.

use crate::fanout::{FanoutCoordinator, MailRoute};
use crate::journal::JsonlJournal;
use crate::ledger::{SheetNames, SheetRouter};
use crate::locks::KeyedLocks;
use crate::provision::{Provisioner, RootFolder};
use crate::retry::RetryPolicy;
use crate::sinks::telegram::DEFAULT_API_BASE;
use crate::sinks::{
    CsvLedger, FsPhotoSource, LocalFolderStore, PhotoSource, SpoolMailer, TelegramNotifier,
    TelegramPhotoSource,
};
use crate::{IntakeError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_ROOT_FOLDER: &str = "ULD Submissions";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "uld", "uld-intake")
}

/// Default configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Directory for the journal and other local state
pub fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".uld-intake"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub log_level: Option<String>,
    pub storage: StorageConfig,
    pub ledger: LedgerConfig,
    pub mail: MailConfig,
    pub notify: NotifyConfig,
    pub photos: PhotoConfig,
    pub retry: RetryPolicy,
    pub journal: JournalConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the submission tree
    pub base_dir: Option<PathBuf>,
    /// Name of the shared root folder, created on first use
    pub root_folder_name: String,
    /// Existing root folder id; takes precedence over the name
    pub root_folder_id: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            root_folder_name: DEFAULT_ROOT_FOLDER.to_string(),
            root_folder_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub dir: Option<PathBuf>,
    pub sheets: SheetNames,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub enabled: bool,
    pub from: String,
    pub to: Vec<String>,
    pub spool_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub bot_token: Option<String>,
    pub target_chat_id: Option<i64>,
    pub api_base: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            target_chat_id: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// Read photos from this directory instead of downloading them
    pub inbox_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub path: Option<PathBuf>,
}

impl IntakeConfig {
    /// Load configuration from `path`, or from the default location when no
    /// path is given. A missing default file yields the defaults; a missing
    /// explicit file is an error.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => match default_config_path() {
                Some(default) if default.exists() => Some(default),
                _ => None,
            },
        };
        let mut config = match path {
            Some(path) => Self::from_file(&path).await?,
            None => {
                debug!("No configuration file found, using defaults");
                Self::default()
            }
        };
        config.merge_env_vars();
        Ok(config)
    }

    async fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            IntakeError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = toml::from_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env(|key| std::env::var(key).ok());
    }

    fn merge_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(token) = var("ULD_INTAKE_BOT_TOKEN") {
            self.notify.bot_token = Some(token);
        }

        if let Some(chat_id) = var("ULD_INTAKE_TARGET_CHAT_ID") {
            match chat_id.trim().parse::<i64>() {
                Ok(id) => self.notify.target_chat_id = Some(id),
                Err(_) => warn!("Ignoring invalid ULD_INTAKE_TARGET_CHAT_ID '{}'", chat_id),
            }
        }

        if let Some(dir) = var("ULD_INTAKE_STORAGE_DIR") {
            self.storage.base_dir = Some(PathBuf::from(dir));
        }

        if let Some(level) = var("ULD_INTAKE_LOG_LEVEL") {
            self.log_level = Some(level);
        }

        if let Some(enabled) = var("ULD_INTAKE_MAIL_ENABLED") {
            if let Ok(value) = enabled.trim().parse::<bool>() {
                self.mail.enabled = value;
            }
        }
    }

    pub fn root_folder(&self) -> RootFolder {
        match &self.storage.root_folder_id {
            Some(id) => RootFolder::Fixed(id.clone()),
            None => RootFolder::Named(self.storage.root_folder_name.clone()),
        }
    }

    pub fn journal_path(&self) -> PathBuf {
        self.journal
            .path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("journal.jsonl"))
    }

    pub fn open_journal(&self) -> JsonlJournal {
        JsonlJournal::new(self.journal_path())
    }

    fn photo_source(&self) -> Result<Arc<dyn PhotoSource>> {
        if let Some(inbox) = &self.photos.inbox_dir {
            return Ok(Arc::new(FsPhotoSource::new(inbox)));
        }
        match &self.notify.bot_token {
            Some(token) => Ok(Arc::new(TelegramPhotoSource::new(
                token,
                &self.notify.api_base,
            )?)),
            None => Ok(Arc::new(FsPhotoSource::new("."))),
        }
    }

    /// Wire the configured sinks into a fan-out coordinator
    pub fn build_coordinator(&self) -> Result<FanoutCoordinator> {
        let locks = KeyedLocks::new();
        let mut builder = FanoutCoordinator::builder(self.photo_source()?, self.root_folder())
            .retry(self.retry);

        match &self.storage.base_dir {
            Some(dir) => {
                builder = builder.provisioner(Provisioner::new(
                    Arc::new(LocalFolderStore::new(dir)),
                    locks.clone(),
                    self.retry,
                ));
            }
            None => warn!("No storage directory configured; submissions cannot be finalized"),
        }

        if let Some(dir) = &self.ledger.dir {
            builder = builder.sheets(SheetRouter::new(
                Arc::new(CsvLedger::new(dir)),
                self.ledger.sheets.clone(),
                locks,
                self.retry,
            ));
        }

        if self.mail.enabled {
            match &self.mail.spool_dir {
                Some(dir) => {
                    builder = builder.mail(MailRoute {
                        mailer: Arc::new(SpoolMailer::new(dir)),
                        from: self.mail.from.clone(),
                        to: self.mail.to.clone(),
                    });
                }
                None => warn!("Mail is enabled but no spool directory is configured"),
            }
        }

        match (&self.notify.bot_token, self.notify.target_chat_id) {
            (Some(token), Some(chat_id)) => {
                builder = builder.notifier(Arc::new(TelegramNotifier::new(
                    token,
                    chat_id,
                    &self.notify.api_base,
                )?));
            }
            (Some(_), None) => warn!("Bot token set without a target chat id; notifications off"),
            _ => {}
        }

        Ok(builder.build())
    }

    /// TOML rendering with the bot token masked
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.notify.bot_token.is_some() {
            shown.notify.bot_token = Some("********".to_string());
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| IntakeError::configuration(format!("cannot render configuration: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let config: IntakeConfig = toml::from_str(
            r#"
            log_level = "debug"

            [storage]
            base_dir = "/srv/uld"
            root_folder_name = "Submissions"

            [ledger]
            dir = "/srv/ledger"
            [ledger.sheets]
            inbound = "In"

            [mail]
            enabled = true
            from = "bot@example.com"
            to = ["ops@example.com"]
            spool_dir = "/srv/mail"

            [notify]
            target_chat_id = -100123

            [retry]
            max_attempts = 5
            base_delay = "250ms"
            attempt_timeout = "10s"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.storage.base_dir, Some(PathBuf::from("/srv/uld")));
        assert_eq!(
            config.root_folder(),
            RootFolder::Named("Submissions".to_string())
        );
        assert_eq!(config.ledger.sheets.inbound, "In");
        assert_eq!(config.ledger.sheets.outbound, "Outbound");
        assert!(config.mail.enabled);
        assert_eq!(config.notify.target_chat_id, Some(-100123));
        assert_eq!(config.notify.api_base, DEFAULT_API_BASE);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
        assert_eq!(config.retry.attempt_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: IntakeConfig = toml::from_str("").unwrap();
        assert_eq!(config, IntakeConfig::default());
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(
            config.root_folder(),
            RootFolder::Named(DEFAULT_ROOT_FOLDER.to_string())
        );
    }

    #[test]
    fn test_fixed_root_folder_wins() {
        let mut config = IntakeConfig::default();
        config.storage.root_folder_id = Some("abc".to_string());
        assert_eq!(config.root_folder(), RootFolder::Fixed("abc".to_string()));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ULD_INTAKE_BOT_TOKEN", "123:abc"),
            ("ULD_INTAKE_TARGET_CHAT_ID", "-42"),
            ("ULD_INTAKE_STORAGE_DIR", "/data"),
            ("ULD_INTAKE_LOG_LEVEL", "trace"),
            ("ULD_INTAKE_MAIL_ENABLED", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = IntakeConfig::default();
        config.merge_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.notify.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.notify.target_chat_id, Some(-42));
        assert_eq!(config.storage.base_dir, Some(PathBuf::from("/data")));
        assert_eq!(config.log_level.as_deref(), Some("trace"));
        assert!(config.mail.enabled);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = IntakeConfig::default();
        config.notify.target_chat_id = Some(7);
        config.merge_env(|key| match key {
            "ULD_INTAKE_TARGET_CHAT_ID" => Some("not-a-number".to_string()),
            "ULD_INTAKE_MAIL_ENABLED" => Some("maybe".to_string()),
            _ => None,
        });
        assert_eq!(config.notify.target_chat_id, Some(7));
        assert!(!config.mail.enabled);
    }

    #[tokio::test]
    async fn test_load_missing_explicit_file_fails() {
        let temp = TempDir::new().unwrap();
        let result = IntakeConfig::load(Some(temp.path().join("missing.toml").as_path())).await;
        assert!(matches!(result, Err(IntakeError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[storage\nbase_dir = 1").unwrap();
        assert!(matches!(
            IntakeConfig::load(Some(path.as_path())).await,
            Err(IntakeError::Toml(_))
        ));
    }

    #[test]
    fn test_redacted_toml_masks_token() {
        let mut config = IntakeConfig::default();
        config.notify.bot_token = Some("123:secret".to_string());
        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("********"));
    }

    #[test]
    fn test_coordinator_builds_from_local_config() {
        let temp = TempDir::new().unwrap();
        let mut config = IntakeConfig::default();
        config.storage.base_dir = Some(temp.path().join("store"));
        config.ledger.dir = Some(temp.path().join("ledger"));
        config.photos.inbox_dir = Some(temp.path().to_path_buf());
        assert!(config.build_coordinator().is_ok());
    }
}
