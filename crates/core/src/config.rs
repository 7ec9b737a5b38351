use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use trackline_transport::{Seconds, WAVEFORM_BUCKETS};

/// Editor tunables, read from `engine.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Undo steps kept before the oldest is dropped.
    pub history_depth: usize,
    /// Distance within which a dragged clip snaps to a neighbour edge.
    pub snap_threshold: Seconds,
    pub waveform_buckets: usize,
    /// Default nudge step in milliseconds.
    pub nudge_ms: f64,
    /// Cut remainders shorter than this are dropped.
    pub min_remainder: Seconds,
    pub default_volume: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_depth: 50,
            snap_threshold: 0.1,
            waveform_buckets: WAVEFORM_BUCKETS,
            nudge_ms: 100.0,
            min_remainder: 0.001,
            default_volume: 1.0,
        }
    }
}

impl EngineConfig {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("trackline").join("engine.toml"))
    }

    /// Load from the user config directory, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).unwrap_or_else(|err| {
                log::warn!("ignoring malformed {}: {err}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("no config directory on this platform"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = EngineConfig::from_toml_str("history_depth = 5\n").unwrap();
        assert_eq!(config.history_depth, 5);
        assert_eq!(config.snap_threshold, 0.1);
        assert_eq!(config.waveform_buckets, 1000);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, "history_depth = \"lots\"").unwrap();
        assert_eq!(EngineConfig::load_from(&path), EngineConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("engine.toml");
        let config = EngineConfig {
            nudge_ms: 250.0,
            ..EngineConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(EngineConfig::load_from(&path), config);
    }
}
