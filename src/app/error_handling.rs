//! Fatal error reporting for the binary

use crate::IntakeError;
use tracing::error;

pub const GENERAL_ERROR: i32 = 1;
pub const CONFIG_ERROR: i32 = 2;

/// Exit code for an error that reached `main`
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<IntakeError>() {
        Some(IntakeError::Configuration(_)) | Some(IntakeError::Toml(_)) => CONFIG_ERROR,
        _ => GENERAL_ERROR,
    }
}

/// Print the error and exit. The full cause chain is shown with `-v`.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("Error: {error}");

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code(&error))
}
