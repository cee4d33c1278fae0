//! TOML export configuration.
//!
//! ```toml
//! [layout]
//! weights = "class_major"
//! clauses = "interleaved"
//!
//! [output]
//! write_manifest = true
//! ```
//!
//! `[layout]` has no default: the consuming runtime decides it, so it must be stated.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::export::{ClauseLayout, ExportLayout, ExportOptions, WeightLayout};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(transparent)]
    AppDirs(#[from] app_dirs::AppDirError),
    #[error(
        "No export layout configured; pass --preset, --weights/--clauses, or a config file with a [layout] table"
    )]
    MissingLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub layout: ExportLayout,
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_true")]
    pub write_manifest: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            write_manifest: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl ExportConfig {
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            layout: self.layout,
            write_manifest: self.output.write_manifest,
        }
    }
}

/// Command line values that may override or replace a config file.
#[derive(Debug, Clone, Default)]
pub struct LayoutOverrides {
    pub preset: Option<ExportLayout>,
    pub weights: Option<WeightLayout>,
    pub clauses: Option<ClauseLayout>,
    pub write_manifest: Option<bool>,
}

/// Load an export config from a TOML file.
pub fn load_config(path: &Path) -> Result<ExportConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the effective config.
///
/// Order: `explicit` file, otherwise the default `export.toml` in the app directory when it
/// exists; then command line overrides on top. Fails when no source names both layouts.
pub fn resolve_config(
    explicit: Option<&Path>,
    overrides: &LayoutOverrides,
) -> Result<ExportConfig, ConfigError> {
    let from_file = match explicit {
        Some(path) => Some(load_config(path)?),
        None if overrides.preset.is_none()
            && (overrides.weights.is_none() || overrides.clauses.is_none()) =>
        {
            let default_path = app_dirs::default_config_path()?;
            if default_path.is_file() {
                tracing::debug!("Using default config {}", default_path.display());
                Some(load_config(&default_path)?)
            } else {
                None
            }
        }
        None => None,
    };
    merge(from_file, overrides)
}

fn merge(
    base: Option<ExportConfig>,
    overrides: &LayoutOverrides,
) -> Result<ExportConfig, ConfigError> {
    let base_layout = overrides.preset.or(base.as_ref().map(|config| config.layout));
    let weights = overrides
        .weights
        .or(base_layout.map(|layout| layout.weights))
        .ok_or(ConfigError::MissingLayout)?;
    let clauses = overrides
        .clauses
        .or(base_layout.map(|layout| layout.clauses))
        .ok_or(ConfigError::MissingLayout)?;
    let mut output = base.map(|config| config.output).unwrap_or_default();
    if let Some(write_manifest) = overrides.write_manifest {
        output.write_manifest = write_manifest;
    }
    Ok(ExportConfig {
        layout: ExportLayout { weights, clauses },
        output,
    })
}
