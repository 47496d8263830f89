pub mod commands;
pub mod error;
pub mod output;

pub use commands::{ModelsCommand, ProvidersCommand, SettingsCommand};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, truncate_string};
