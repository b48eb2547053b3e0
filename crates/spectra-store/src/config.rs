use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use spectra_core::{IdentifierLimits, Tolerances};

use crate::error::{Result, StoreError};

pub const DB_FILENAME: &str = "spectra.db";
pub const CONFIG_FILENAME: &str = "config.toml";

/// Data directory: `SPECTRA_DATA_DIR`, else `~/.spectra`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("SPECTRA_DATA_DIR")
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }
    dirs_home().join(".spectra")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Largest vertex count seeded from the family formulas.
    pub max_n: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self { max_n: 8 }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
    /// Largest product vertex count precomputed from cached factors.
    pub max_n: usize,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self { max_n: 16 }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub tolerances: Tolerances,
    pub seed: SeedConfig,
    pub products: ProductConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    tolerances: Tolerances,
    limits: Option<IdentifierLimits>,
    seed: SeedConfig,
    products: ProductConfig,
}

impl Config {
    /// Read `<dir>/config.toml`. A missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILENAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            StoreError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))?;
        let mut tolerances = raw.tolerances;
        if let Some(limits) = raw.limits {
            tolerances.limits = limits;
        }
        Ok(Self {
            tolerances,
            seed: raw.seed,
            products: raw.products,
        })
    }

    pub fn db_path(dir: &Path) -> PathBuf {
        dir.join(DB_FILENAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.seed.max_n, 8);
        assert_eq!(config.products.max_n, 16);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml_str(
            "[tolerances]\nidentify = 1e-6\n\n[limits]\nmax_integer = 100\n\n[seed]\nmax_n = 5\n",
        )
        .unwrap();
        assert_eq!(config.tolerances.identify, 1e-6);
        assert_eq!(config.tolerances.zero, Tolerances::default().zero);
        assert_eq!(config.tolerances.limits.max_integer, 100);
        assert_eq!(
            config.tolerances.limits.max_radicand,
            IdentifierLimits::default().max_radicand
        );
        assert_eq!(config.seed.max_n, 5);
        assert_eq!(config.products.max_n, 16);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "[products]\nmax_n = 9\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.products.max_n, 9);
    }

    #[test]
    fn test_invalid_config() {
        let err = Config::from_toml_str("[seed]\nmax_n = \"lots\"\n").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));

        let err = Config::from_toml_str("[unknown]\nx = 1\n").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_db_path() {
        let path = Config::db_path(Path::new("/tmp/spectra"));
        assert_eq!(path, PathBuf::from("/tmp/spectra/spectra.db"));
    }
}
