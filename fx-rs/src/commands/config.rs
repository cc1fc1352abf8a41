//! Effect settings file command implementations

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use fx_particles::EffectSettings;
use std::fs;
use std::path::PathBuf;

use super::{SettingsFormat, load_settings};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a settings file filled with the defaults
    Init {
        /// Output file (.yaml, .yml or .json); prints YAML to stdout when omitted
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective settings after range clamping
    Show {
        /// Settings file to read
        file: PathBuf,

        /// Output encoding
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: SettingsFormat,
    },
}

pub fn execute(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Init { output, force } => handle_init(output, force),
        ConfigCommands::Show { file, format } => handle_show(&file, format),
    }
}

fn handle_init(output: Option<PathBuf>, force: bool) -> Result<()> {
    let settings = EffectSettings::default();

    let Some(path) = output else {
        print!("{}", SettingsFormat::Yaml.render(&settings)?);
        return Ok(());
    };

    let format = SettingsFormat::from_path(&path)?;
    if path.exists() && !force {
        bail!(
            "{} already exists, use --force to overwrite it",
            path.display()
        );
    }

    let text = format.render(&settings)?;
    fs::write(&path, text)
        .with_context(|| format!("Failed to write settings file: {}", path.display()))?;
    log::info!("Wrote default settings to {}", path.display());
    println!("Created {}", path.display());
    Ok(())
}

fn handle_show(file: &PathBuf, format: SettingsFormat) -> Result<()> {
    let settings = load_settings(file)?
        .sanitized()
        .context("Settings could not be sanitized")?;
    print!("{}", format.render(&settings)?);
    if format == SettingsFormat::Json {
        println!();
    }
    Ok(())
}
