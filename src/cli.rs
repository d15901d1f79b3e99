//! Command-line interface for storycam
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Continuous camera-to-story narration pipeline
#[derive(Parser, Debug)]
#[command(
    name = "storycam",
    version,
    about = "Continuous camera-to-story narration pipeline"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress status output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: cycle phases, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Story service endpoint override
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Capture device override (e.g., /dev/video0)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Cycle interval (default: 30s). Examples: 45s, 2m, 1h
    #[arg(long, value_name = "DURATION", value_parser = parse_interval_secs)]
    pub interval: Option<u64>,

    /// Run a single cycle and exit instead of continuous mode
    #[arg(long)]
    pub once: bool,
}

/// Parse an interval duration string into seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (seconds), single-unit (`30s`, `5m`, `2h`), and compound (`1h30m`).
fn parse_interval_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio output devices
    #[cfg(feature = "cpal-audio")]
    Devices,

    /// Manage configuration
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the active configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_args() {
        let cli = Cli::try_parse_from(["storycam"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.once);
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from([
            "storycam",
            "--endpoint",
            "http://example.com/story",
            "--device",
            "/dev/video1",
            "--interval",
            "45s",
            "--once",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.endpoint.as_deref(), Some("http://example.com/story"));
        assert_eq!(cli.device.as_deref(), Some("/dev/video1"));
        assert_eq!(cli.interval, Some(45));
        assert!(cli.once);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_interval_formats() {
        assert_eq!(parse_interval_secs("30"), Ok(30));
        assert_eq!(parse_interval_secs("45s"), Ok(45));
        assert_eq!(parse_interval_secs("2m"), Ok(120));
        assert_eq!(parse_interval_secs("1h30m"), Ok(5400));
        assert!(parse_interval_secs("soon").is_err());
    }

    #[test]
    fn test_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["storycam", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn test_config_path_flag_is_global() {
        let cli =
            Cli::try_parse_from(["storycam", "config", "path", "--config", "/tmp/s.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
    }
}
