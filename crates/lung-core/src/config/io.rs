//! YAML persistence for configuration types
//!
//! Loading never fails: a missing or unreadable file yields the type's
//! defaults so the engine can always start.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Load a configuration from a YAML file
///
/// Returns `T::default()` when the file does not exist, cannot be read or
/// does not parse. Fields missing from the file take their defaults when
/// `T` is marked `#[serde(default)]`.
///
/// ```ignore
/// let config: EngineConfig = load_config(Path::new("lung.yaml"));
/// ```
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("config: {:?} not found, using defaults", path);
        return T::default();
    }

    let parsed = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))
        .and_then(|text| {
            serde_yaml::from_str::<T>(&text)
                .with_context(|| format!("Failed to parse config file: {:?}", path))
        });

    match parsed {
        Ok(config) => {
            log::info!("config: loaded {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("config: {:#}, using defaults", e);
            T::default()
        }
    }
}

/// Save a configuration to a YAML file, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("config: saved {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, FilterKind};

    #[test]
    fn test_missing_file_yields_defaults() {
        let config: EngineConfig = load_config(Path::new("/nonexistent/lung/engine.yaml"));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_engine_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("engine.yaml");

        let mut config = EngineConfig::default();
        config.block_size = 64;
        config.fx1_filter = FilterKind::Highpass;
        config.conditioner.median3_mask = 0b1010_0000;

        save_config(&config, &path).unwrap();
        let loaded: EngineConfig = load_config(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, "block_size: [not, a, number").unwrap();

        let config: EngineConfig = load_config(&path);
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, "output_sample_rate: 44100\nconditioner:\n  cutoff_hz: 5.0\n").unwrap();

        let config: EngineConfig = load_config(&path);
        assert_eq!(config.output_sample_rate, 44100);
        assert_eq!(config.conditioner.cutoff_hz, 5.0);
        assert_eq!(config.block_size, EngineConfig::default().block_size);
        assert_eq!(config.conditioner.median3_mask, 0);
    }
}
