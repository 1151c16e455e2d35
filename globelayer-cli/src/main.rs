//! GlobeLayer CLI - Command-line interface
//!
//! Drives the GlobeLayer engine headlessly against live imagery and elevation
//! services and manages the configuration file.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use globelayer::config::default_config_path;

use commands::config::ConfigCommands;
use commands::run::RunArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "globelayer")]
#[command(version, about = "Tiled level-of-detail globe with elevation-draped terrain")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the globe headlessly and print what it built
    Run {
        /// Camera latitude in degrees
        #[arg(long, default_value_t = 46.55, allow_hyphen_values = true)]
        lat: f64,

        /// Camera longitude in degrees
        #[arg(long, default_value_t = 7.98, allow_hyphen_values = true)]
        lon: f64,

        /// Pyramid level to view
        #[arg(long, default_value_t = 8)]
        level: u32,

        /// Camera pitch in degrees (90 looks straight down)
        #[arg(long, default_value_t = 60.0)]
        pitch: f64,

        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(long)]
        seconds: Option<u64>,

        /// Render everything flat
        #[arg(long)]
        no_terrain: bool,

        /// XYZ imagery URL template with {z}, {y} and {x}
        #[arg(long)]
        image_url: Option<String>,

        /// Elevation service URL
        #[arg(long)]
        elevation_url: Option<String>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = dispatch(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    match cli.command {
        Commands::Run {
            lat,
            lon,
            level,
            pitch,
            seconds,
            no_terrain,
            image_url,
            elevation_url,
        } => commands::run::run(
            RunArgs {
                lat,
                lon,
                level,
                pitch,
                seconds,
                no_terrain,
                image_url,
                elevation_url,
            },
            &config_path,
        ),
        Commands::Config { command } => commands::config::run(command, &config_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from([
            "globelayer",
            "run",
            "--lat",
            "-33.86",
            "--lon",
            "151.2",
            "--level",
            "12",
            "--no-terrain",
        ]);
        match cli.command {
            Commands::Run {
                lat,
                level,
                no_terrain,
                pitch,
                ..
            } => {
                assert_eq!(lat, -33.86);
                assert_eq!(level, 12);
                assert!(no_terrain);
                assert_eq!(pitch, 60.0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_with_global_path() {
        let cli = Cli::parse_from(["globelayer", "config", "path", "--config", "/tmp/g.ini"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/g.ini")));
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Path
            }
        ));
    }
}
