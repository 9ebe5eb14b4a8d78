//! Runtime bootstrap and shutdown
//!
//! Loads configuration, opens the submission journal and wires the bot.
//! The journal stays open for the life of the process and is flushed and
//! closed by [`IntakeRuntime::shutdown`].

use crate::app::config::AppConfig;
use crate::bot::IntakeBot;
use crate::config::IntakeConfig;
use crate::journal::SubmissionJournal;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub struct IntakeRuntime {
    pub config: IntakeConfig,
    pub bot: Arc<IntakeBot>,
    journal: Arc<dyn SubmissionJournal>,
}

impl IntakeRuntime {
    /// Build the runtime from already loaded configuration
    pub async fn start(config: IntakeConfig) -> Result<Self> {
        let journal: Arc<dyn SubmissionJournal> = Arc::new(config.open_journal());
        journal
            .open()
            .await
            .with_context(|| format!("Failed to open journal {}", config.journal_path().display()))?;
        debug!("Journal opened at {}", config.journal_path().display());

        let fanout = config
            .build_coordinator()
            .context("Failed to set up submission sinks")?;
        let bot = Arc::new(IntakeBot::new(Arc::new(fanout), journal.clone()));

        info!("Intake runtime ready");
        Ok(Self {
            config,
            bot,
            journal,
        })
    }

    pub fn journal(&self) -> &Arc<dyn SubmissionJournal> {
        &self.journal
    }

    /// Flush and close the journal
    pub async fn shutdown(self) -> Result<()> {
        self.journal
            .flush()
            .await
            .context("Failed to flush journal")?;
        self.journal
            .close()
            .await
            .context("Failed to close journal")?;
        info!("Intake runtime stopped");
        Ok(())
    }
}

/// Load configuration for the given command line settings
pub async fn load_config(app: &AppConfig) -> Result<IntakeConfig> {
    IntakeConfig::load(app.config_path.as_deref())
        .await
        .context("Failed to load configuration")
}
