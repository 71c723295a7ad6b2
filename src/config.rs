use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            page_size: default_page_size(),
        }
    }
}

fn default_limit() -> i64 {
    10
}
fn default_page_size() -> i64 {
    20
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.search.default_limit < 1 {
        anyhow::bail!("search.default_limit must be >= 1");
    }
    if config.search.page_size < 1 {
        anyhow::bail!("search.page_size must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: Config = toml::from_str("[db]\npath = \"data/cbx.sqlite\"\n").unwrap();
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.search.page_size, 20);
    }

    #[test]
    fn test_invalid_limit_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cbx.toml");
        std::fs::write(
            &path,
            "[db]\npath = \"data/cbx.sqlite\"\n\n[search]\ndefault_limit = 0\n",
        )
        .unwrap();
        assert!(load_config(&path).is_err());
    }
}
