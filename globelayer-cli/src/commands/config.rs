//! Configuration management CLI commands.
//!
//! Provides `config init`, `config show`, and `config path`.

use std::path::Path;

use clap::Subcommand;
use globelayer::config::ConfigFile;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand against the file at `path`.
pub fn run(command: ConfigCommands, path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { force } => {
            init(path, force)?;
            println!("Configuration file: {}", path.display());
            println!();
            println!("Edit this file to customize GlobeLayer settings.");
            println!("CLI arguments override config file values when specified.");
            Ok(())
        }
        ConfigCommands::Show => {
            print!("{}", show(path)?);
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Writes the default configuration to `path`.
fn init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }
    ConfigFile::default().save(path)?;
    Ok(())
}

/// Renders the configuration at `path`, or the defaults if it does not exist.
fn show(path: &Path) -> Result<String, CliError> {
    let config = ConfigFile::load_or_default(path)?;
    // Reject values that parse but fail validation.
    config.to_globe_config()?;
    Ok(config.to_ini_string())
}
