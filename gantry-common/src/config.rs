//! Configuration loading and data folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Data folder resolution priority order:
/// 1. Explicit argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`data_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_folder(explicit: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: explicit argument
    if let Some(path) = explicit {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_folder) = config.get("data_folder").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(data_folder));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_data_folder())
}

/// Locate the platform configuration file for Gantry services
pub fn locate_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("gantry").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    let system_config = PathBuf::from("/etc/gantry/config.toml");
    if system_config.exists() {
        return Ok(system_config);
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("gantry"))
        .unwrap_or_else(|| PathBuf::from("./gantry_data"))
}

/// Ensure the data folder exists, creating it when missing
pub fn ensure_data_folder(path: &PathBuf) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        tracing::info!("Created data folder: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_argument_wins() {
        let resolved = resolve_data_folder(Some("/tmp/gantry-test"), "GANTRY_TEST_UNSET").unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/gantry-test"));
    }

    #[test]
    fn env_var_beats_default() {
        std::env::set_var("GANTRY_TEST_DATA", "/tmp/gantry-env");
        let resolved = resolve_data_folder(None, "GANTRY_TEST_DATA").unwrap();
        std::env::remove_var("GANTRY_TEST_DATA");
        assert_eq!(resolved, PathBuf::from("/tmp/gantry-env"));
    }

    #[test]
    fn ensure_creates_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_data_folder(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
