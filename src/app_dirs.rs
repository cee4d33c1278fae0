//! Locations of tool-owned files (default config, logs).
//!
//! Everything lives under a single `.tm-export` folder in the OS config directory. Set
//! `TM_EXPORT_CONFIG_HOME` to relocate it, e.g. for CI or portable setups.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the tool directory under the OS config root.
pub const APP_DIR_NAME: &str = ".tm-export";
/// Environment variable overriding the config root.
pub const CONFIG_HOME_ENV: &str = "TM_EXPORT_CONFIG_HOME";
/// File name of the default export configuration.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "export.toml";

static BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No config directory available for tm-export files")]
    NoBaseDir,
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The `.tm-export` root, created on demand.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_path()?)
}

/// Per-launch log files.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join("logs"))
}

/// Path of the default `export.toml`. Neither the file nor its directory is created.
pub fn default_config_path() -> Result<PathBuf, AppDirError> {
    Ok(app_root_path()?.join(DEFAULT_CONFIG_FILE_NAME))
}

fn app_root_path() -> Result<PathBuf, AppDirError> {
    let base = base_dir().ok_or(AppDirError::NoBaseDir)?;
    Ok(base.join(APP_DIR_NAME))
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn base_dir() -> Option<PathBuf> {
    if let Some(path) = BASE_OVERRIDE.lock().ok().and_then(|guard| guard.clone()) {
        return Some(path);
    }
    if let Some(path) = std::env::var_os(CONFIG_HOME_ENV) {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(test)]
pub(crate) fn set_base_override(path: Option<PathBuf>) {
    let mut guard = BASE_OVERRIDE
        .lock()
        .expect("base override mutex poisoned");
    *guard = path;
}

#[cfg(test)]
pub(crate) struct BaseOverrideGuard;

#[cfg(test)]
impl BaseOverrideGuard {
    pub(crate) fn set(path: PathBuf) -> Self {
        set_base_override(Some(path));
        Self
    }
}

#[cfg(test)]
impl Drop for BaseOverrideGuard {
    fn drop(&mut self) {
        set_base_override(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, LayoutOverrides, resolve_config};
    use crate::export::WeightLayout;
    use tempfile::tempdir;

    #[test]
    fn override_anchors_all_paths() {
        let base = tempdir().unwrap();
        let _guard = BaseOverrideGuard::set(base.path().to_path_buf());
        let expected_root = base.path().join(APP_DIR_NAME);

        // Looking up the default config is read-only.
        let config_path = default_config_path().unwrap();
        assert_eq!(config_path, expected_root.join(DEFAULT_CONFIG_FILE_NAME));
        let overrides = LayoutOverrides {
            weights: Some(WeightLayout::ClassMajor),
            ..Default::default()
        };
        assert!(matches!(
            resolve_config(None, &overrides),
            Err(ConfigError::MissingLayout)
        ));
        assert!(!expected_root.exists());

        let root = app_root_dir().unwrap();
        assert_eq!(root, expected_root);
        assert!(root.is_dir());
        assert!(logs_dir().unwrap().is_dir());
        assert_eq!(
            default_config_path().unwrap(),
            root.join(DEFAULT_CONFIG_FILE_NAME)
        );
    }
}
