//! Logging initialization

use crate::app::config::AppConfig;
use tracing::{debug, trace};

/// Filter used by the subscriber: an explicit `-v` wins over a configured
/// level, which wins over the default
pub fn effective_filter(config: &AppConfig, configured: Option<&str>) -> String {
    match configured {
        Some(level) if config.verbose == 0 && !level.trim().is_empty() => level.trim().to_string(),
        _ => config.log_level().to_string(),
    }
}

/// Initialize tracing for the application
pub fn init_logging(config: &AppConfig, configured: Option<&str>) {
    let filter = effective_filter(config, configured);

    tracing_subscriber::fmt()
        .with_env_filter(filter.as_str())
        .with_target(config.verbose >= 2) // Show target module for -vv and above
        .with_thread_ids(config.verbose >= 3) // Show thread IDs for -vvv
        .with_line_number(config.verbose >= 3) // Show line numbers for -vvv
        .with_writer(std::io::stderr)
        .init();

    debug!("uld-intake started with log filter: {}", filter);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}
