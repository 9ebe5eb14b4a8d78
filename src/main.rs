use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{stdin, stdout, BufReader};
use tracing::debug;
use uld_intake::app::{self, console, AppConfig, IntakeRuntime};
use uld_intake::journal::SubmissionJournal;
use uld_intake::submission::Submitter;

/// Collect logistics submissions through a guided dialogue
#[derive(Parser)]
#[command(name = "uld-intake", version)]
#[command(about = "Logistics intake bot: guided submissions fanned out to storage, ledger, email and chat", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dialogue on stdin/stdout for one submitter
    Console {
        /// Display name of the submitter
        #[arg(long, default_value = "Console User")]
        name: String,

        /// Username shown next to the name
        #[arg(long)]
        username: Option<String>,

        /// Numeric submitter id
        #[arg(long, default_value = "1")]
        id: i64,
    },
    /// Load and print the effective configuration
    CheckConfig,
    /// Print recent submissions from the journal
    Review {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let app_config = AppConfig::new(cli.verbose).with_config_path(cli.config.clone());

    let config = match app::load_config(&app_config).await {
        Ok(config) => config,
        Err(e) => {
            app::init_logging(&app_config, None);
            app::handle_fatal_error(e, cli.verbose)
        }
    };
    app::init_logging(&app_config, config.log_level.as_deref());

    let result = match cli.command {
        Commands::Console { name, username, id } => {
            run_console(config, Submitter::new(id, name, username)).await
        }
        Commands::CheckConfig => run_check_config(&config),
        Commands::Review { limit } => run_review(config, limit).await,
    };

    if let Err(e) = result {
        app::handle_fatal_error(e, cli.verbose);
    }
}

async fn run_console(
    config: uld_intake::config::IntakeConfig,
    submitter: Submitter,
) -> anyhow::Result<()> {
    let runtime = IntakeRuntime::start(config).await?;
    debug!("Console session for {}", submitter);
    println!("Type /start to begin a submission, /help for instructions.\n");

    let outcome = console::run_console(
        &runtime.bot,
        &submitter,
        BufReader::new(stdin()),
        stdout(),
    )
    .await;

    runtime.shutdown().await?;
    outcome
}

fn run_check_config(config: &uld_intake::config::IntakeConfig) -> anyhow::Result<()> {
    print!("{}", config.to_redacted_toml()?);
    println!("# journal: {}", config.journal_path().display());
    if config.storage.base_dir.is_none() {
        println!("# warning: no storage directory; finalize will fail");
    }
    Ok(())
}

async fn run_review(config: uld_intake::config::IntakeConfig, limit: usize) -> anyhow::Result<()> {
    let journal = config.open_journal();
    let entries = journal.recent(limit).await?;
    if entries.is_empty() {
        println!("No submissions have been recorded yet.");
    }
    for entry in entries {
        println!("{}", entry.summary_line());
    }
    Ok(())
}
