mod cli;
mod client_error;
mod config;

pub use cli::Cli;
pub use client_error::ClientError;
pub use config::{CartSettings, DatabaseSettings, ServerSettings, Settings, get_config_settings};
