//! Configuration system for mnemograph.

use crate::errors::Error;
use serde::Deserialize;
use std::path::PathBuf;

/// Configuration values with priority: defaults < config file < env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the SQLite database.
    #[serde(default)]
    pub database_path: PathBuf,

    /// Path to the ANN index backing file. The file is a derived cache:
    /// deleting it loses nothing, the index rebuilds from the store.
    #[serde(default)]
    pub index_path: PathBuf,

    /// HuggingFace embedding model identifier.
    #[serde(default)]
    pub embedding_model: String,

    /// Cosine similarity above which two search results are considered
    /// near-duplicates and collapsed to the higher-ranked one.
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f64,

    /// Minimum fresh cosine similarity for precise-search results.
    #[serde(default = "default_precise_threshold")]
    pub precise_threshold: f64,
}

fn default_dedup_threshold() -> f64 {
    0.90
}

fn default_precise_threshold() -> f64 {
    0.95
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| home.join(".local/share"));

        Self {
            database_path: data_dir.join("mnemograph/memories.db"),
            index_path: data_dir.join("mnemograph/index.bin"),
            embedding_model: "BAAI/bge-small-en-v1.5".to_string(),
            dedup_threshold: default_dedup_threshold(),
            precise_threshold: default_precise_threshold(),
        }
    }
}

/// On-disk layout of the config file; absent fields fall back to defaults.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    database_path: PathBuf,
    #[serde(default)]
    index_path: PathBuf,
    #[serde(default)]
    embedding_model: String,
    dedup_threshold: Option<f64>,
    precise_threshold: Option<f64>,
}

impl Config {
    /// Load configuration: defaults, then the toml config file (if any),
    /// then `MNEMOGRAPH_*` environment overrides.
    pub fn load() -> Result<Self, Error> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let config_dir = dirs::config_dir().unwrap_or_else(|| home.join(".config"));
        let config_path = config_dir.join("mnemograph/config.toml");

        let mut config = Self::default();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).map_err(|e| {
                Error::Config(format!(
                    "Failed to read config file {}: {e}",
                    config_path.display()
                ))
            })?;
            let file: ConfigFile = toml::from_str(&content).map_err(|e| {
                Error::Config(format!(
                    "Failed to parse config file {}: {e}",
                    config_path.display()
                ))
            })?;
            config.merge_from_file(file);
        }

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn merge_from_file(&mut self, file: ConfigFile) {
        if !file.database_path.as_os_str().is_empty() {
            self.database_path = file.database_path;
        }
        if !file.index_path.as_os_str().is_empty() {
            self.index_path = file.index_path;
        }
        if !file.embedding_model.is_empty() {
            self.embedding_model = file.embedding_model;
        }
        if let Some(threshold) = file.dedup_threshold {
            self.dedup_threshold = threshold;
        }
        if let Some(threshold) = file.precise_threshold {
            self.precise_threshold = threshold;
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), Error> {
        if let Ok(val) = std::env::var("MNEMOGRAPH_DATABASE_PATH") {
            if val.trim().is_empty() {
                return Err(Error::Config(
                    "MNEMOGRAPH_DATABASE_PATH cannot be empty".into(),
                ));
            }
            self.database_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("MNEMOGRAPH_INDEX_PATH") {
            if val.trim().is_empty() {
                return Err(Error::Config("MNEMOGRAPH_INDEX_PATH cannot be empty".into()));
            }
            self.index_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("MNEMOGRAPH_EMBEDDING_MODEL") {
            if val.trim().is_empty() {
                return Err(Error::Config(
                    "MNEMOGRAPH_EMBEDDING_MODEL cannot be empty".into(),
                ));
            }
            self.embedding_model = val;
        }
        if let Ok(val) = std::env::var("MNEMOGRAPH_DEDUP_THRESHOLD") {
            self.dedup_threshold = val.trim().parse().map_err(|e| {
                Error::Config(format!("Invalid MNEMOGRAPH_DEDUP_THRESHOLD value: {e}"))
            })?;
        }
        if let Ok(val) = std::env::var("MNEMOGRAPH_PRECISE_THRESHOLD") {
            self.precise_threshold = val.trim().parse().map_err(|e| {
                Error::Config(format!("Invalid MNEMOGRAPH_PRECISE_THRESHOLD value: {e}"))
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("dedup_threshold", self.dedup_threshold),
            ("precise_threshold", self.precise_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!((config.dedup_threshold - 0.90).abs() < 1e-9);
        assert!((config.precise_threshold - 0.95).abs() < 1e-9);
        assert_eq!(config.embedding_model, "BAAI/bge-small-en-v1.5");
        assert!(config.database_path.ends_with("mnemograph/memories.db"));
    }

    #[test]
    fn test_merge_from_file_partial() {
        let mut config = Config::default();
        let file: ConfigFile = toml::from_str(r#"dedup_threshold = 0.8"#).unwrap();
        config.merge_from_file(file);

        assert!((config.dedup_threshold - 0.8).abs() < 1e-9);
        // untouched fields keep their defaults
        assert!((config.precise_threshold - 0.95).abs() < 1e-9);
        assert_eq!(config.embedding_model, "BAAI/bge-small-en-v1.5");
    }

    #[test]
    fn test_merge_from_file_paths() {
        let mut config = Config::default();
        let file: ConfigFile = toml::from_str(
            r#"
            database_path = "/tmp/custom.db"
            embedding_model = "custom/model"
            "#,
        )
        .unwrap();
        config.merge_from_file(file);

        assert_eq!(config.database_path, PathBuf::from("/tmp/custom.db"));
        assert_eq!(config.embedding_model, "custom/model");
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let config = Config {
            dedup_threshold: 1.5,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
