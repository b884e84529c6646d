//! Config command - manage validation configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use nfe_rtc::core::ValidationConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Write the default configuration to a file
    Init(InitArgs),
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long, default_value = "nfe-rtc.json")]
    output: PathBuf,

    /// Start from the mandatory-phase preset instead of the 2026 pilot
    #[arg(long)]
    mandatory: bool,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(config_path),
        ConfigCommand::Init(init_args) => init_config(init_args),
    }
}

/// Config file from `--config`, or the 2026 pilot defaults.
pub fn load(config_path: Option<&str>) -> anyhow::Result<ValidationConfig> {
    match config_path {
        Some(path) => Ok(ValidationConfig::from_file(Path::new(path))?),
        None => Ok(ValidationConfig::default()),
    }
}

fn show_config(config_path: Option<&str>) -> anyhow::Result<()> {
    if config_path.is_none() {
        eprintln!(
            "{} No config file given, showing defaults.",
            style("ℹ").blue()
        );
    }
    let config = load(config_path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn init_config(args: InitArgs) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            args.output.display()
        );
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let pilot = ValidationConfig::pilot_2026();
    let config = if args.mandatory {
        ValidationConfig::mandatory(pilot.ibs_rate, pilot.cbs_rate)
    } else {
        pilot
    };
    config.save(&args.output)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        args.output.display()
    );

    Ok(())
}
