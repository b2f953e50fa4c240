//! Loading the pipeline [`Config`] for a command.
//!
//! Precedence, lowest first: built-in defaults, the config file
//! (`--config`, or `titler/config.toml` in the user config directory),
//! then command-line flags and `TITLER_*` environment variables.

use std::path::{Path, PathBuf};

use titler_core::Config;

use crate::prelude::*;

/// `~/.config/titler/config.toml` on Linux, the platform equivalent elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join("titler").join("config.toml"))
}

/// Build the configuration for this run.
///
/// An explicit `path` must exist. The default path is optional.
pub fn load(path: Option<&Path>, translate_url: Option<&str>) -> Result<Config> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => read_config(&path)?,
            None => Config::default(),
        },
    };

    if let Some(url) = translate_url {
        config.translate_url = Some(url.to_string());
    }

    config.validate()?;
    log::debug!("configuration: {:?}", config);

    Ok(config)
}

/// Configuration for a command, from its global flags.
pub fn from_global(global: &crate::Global) -> Result<Config> {
    load(global.config.as_deref(), global.translate_url.as_deref())
}

fn read_config(path: &Path) -> Result<Config> {
    let source = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;

    Config::from_toml(&source).wrap_err_with(|| format!("Invalid config file {}", path.display()))
}
