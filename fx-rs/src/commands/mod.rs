//! Command implementations

pub mod config;
pub mod simulate;

use anyhow::{Context, Result, bail};
use fx_particles::EffectSettings;
use std::fs;
use std::path::Path;

/// Settings file encodings understood by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SettingsFormat {
    Yaml,
    Json,
}

impl SettingsFormat {
    /// Pick the encoding from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => bail!(
                "Unsupported settings file '{}': expected .yaml, .yml or .json",
                path.display()
            ),
        }
    }

    /// Serialize settings in this encoding
    pub fn render(self, settings: &EffectSettings) -> Result<String> {
        match self {
            Self::Yaml => {
                serde_yaml_ng::to_string(settings).context("Failed to serialize settings as YAML")
            }
            Self::Json => serde_json::to_string_pretty(settings)
                .context("Failed to serialize settings as JSON"),
        }
    }

    /// Parse settings in this encoding
    pub fn parse(self, text: &str) -> Result<EffectSettings> {
        match self {
            Self::Yaml => serde_yaml_ng::from_str(text).context("Invalid YAML settings"),
            Self::Json => serde_json::from_str(text).context("Invalid JSON settings"),
        }
    }
}

/// Read and validate an effect settings file
pub fn load_settings(path: &Path) -> Result<EffectSettings> {
    let format = SettingsFormat::from_path(path)?;
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    let settings = format
        .parse(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    settings
        .validate()
        .with_context(|| format!("Rejected settings in {}", path.display()))?;
    log::info!("Loaded settings from {}", path.display());
    Ok(settings)
}
