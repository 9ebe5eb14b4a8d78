//! Application layer: command-line settings, logging, runtime bootstrap and
//! the console driver

pub mod config;
pub mod console;
pub mod error_handling;
pub mod logging;
pub mod runtime;

pub use config::AppConfig;
pub use error_handling::handle_fatal_error;
pub use logging::init_logging;
pub use runtime::{load_config, IntakeRuntime};
