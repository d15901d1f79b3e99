use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use storycam::cli::{Cli, Commands, ConfigAction};
use storycam::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            storycam::app::run_pipeline(
                config,
                cli.endpoint,
                cli.device,
                cli.interval,
                cli.quiet,
                cli.verbose,
                cli.once,
            )
            .await?;
        }
        #[cfg(feature = "cpal-audio")]
        Some(Commands::Devices) => {
            let devices = storycam::playback::list_output_devices()?;
            if devices.is_empty() {
                eprintln!("No audio output devices found.");
            }
            for name in devices {
                println!("{name}");
            }
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref())?;
        }
    }

    Ok(())
}

fn config_path(cli_path: Option<&Path>) -> PathBuf {
    cli_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path)
}

fn load_config(cli_path: Option<&Path>) -> Result<Config> {
    Ok(Config::load_or_default(&config_path(cli_path))?.with_env_overrides())
}

fn handle_config_command(action: ConfigAction, cli_path: Option<&Path>) -> Result<()> {
    let path = config_path(cli_path);
    match action {
        ConfigAction::Show => {
            let config = Config::load_or_default(&path)?.with_env_overrides();
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Init => {
            if path.exists() {
                anyhow::bail!("config file already exists at {}", path.display());
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, toml::to_string_pretty(&Config::default())?)?;
            println!("Wrote default config to {}", path.display());
        }
    }
    Ok(())
}
