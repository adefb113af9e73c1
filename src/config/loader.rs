use std::path::Path;

use anyhow::{Context, Result};

use super::types::Config;

/// Name of the per-project config file.
pub const CONFIG_FILE: &str = ".ctrflow";

/// Load `.ctrflow` from the given directory, falling back to defaults when the
/// file does not exist.
pub fn load(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        tracing::debug!(dir = %dir.display(), "no {CONFIG_FILE} found, using defaults");
        return Ok(Config::default());
    }
    load_from(&path)
}

/// Load a config from an explicit file path.
pub fn load_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    // An empty file is a valid "all defaults" config.
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("invalid config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}
