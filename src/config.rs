use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Error;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub datasource: DatasourceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasourceConfig {
    /// Name of the main table whose rows are exposed for indexing.
    pub main_table: String,
    /// Rows per harvest page. Only needed for paged harvests; absence is
    /// fatal there, not at load time.
    #[serde(default)]
    pub tracking_page_size: Option<i64>,
    /// Salt for the per-item label hash attached to loaded documents.
    #[serde(default = "default_hash_salt")]
    pub hash_salt: String,
}

fn default_hash_salt() -> String {
    "rowdex".to_string()
}

impl DatasourceConfig {
    /// Resolve the tracking page size, failing when it is not configured.
    pub fn page_size(&self) -> Result<i64, Error> {
        match self.tracking_page_size {
            Some(size) if size > 0 => Ok(size),
            Some(size) => Err(Error::config(format!(
                "tracking_page_size must be > 0, got {}",
                size
            ))),
            None => Err(Error::config("tracking_page_size is not set")),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate datasource settings
    if config.datasource.main_table.is_empty() {
        anyhow::bail!("datasource.main_table must be set");
    }
    if !is_identifier(&config.datasource.main_table) {
        anyhow::bail!(
            "datasource.main_table must be a bare SQL identifier, got '{}'",
            config.datasource.main_table
        );
    }
    if let Some(size) = config.datasource.tracking_page_size {
        if size < 1 {
            anyhow::bail!("datasource.tracking_page_size must be >= 1");
        }
    }

    Ok(config)
}

/// Table names are interpolated into SQL text, so they must stay bare
/// identifiers.
pub(crate) fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}
