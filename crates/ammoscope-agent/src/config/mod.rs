//! Configuration loading for Ammoscope.
//! Reads ammoscope.toml from the current directory or the path in AMMOSCOPE_CONFIG.
//! AMMOSCOPE_DATABASE_URL, when set, replaces `store.url`.

use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use ammoscope_ingestion::{PipelineOptions, SyncMode};

pub const CONFIG_ENV: &str = "AMMOSCOPE_CONFIG";
pub const DATABASE_URL_ENV: &str = "AMMOSCOPE_DATABASE_URL";
pub const DEFAULT_CONFIG_PATH: &str = "ammoscope.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    /// Nothing persists past the process; for dry runs.
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    pub url: Option<SecretString>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_backend()         -> StoreBackend { StoreBackend::Postgres }
fn default_table()           -> String { ammoscope_db::DEFAULT_TABLE.to_string() }
fn default_max_connections() -> u32 { 5 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            table: default_table(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

fn default_catalog_path() -> PathBuf { PathBuf::from("ammo_data.json") }

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { path: default_catalog_path() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_clean_caliber")]
    pub clean_caliber: bool,
}

fn default_clean_caliber() -> bool { true }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { clean_caliber: default_clean_caliber() }
    }
}

impl PipelineConfig {
    pub fn options(&self, mode: SyncMode) -> PipelineOptions {
        PipelineOptions {
            clean_caliber: self.clean_caliber,
            mode,
            ..PipelineOptions::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directives, used when RUST_LOG is unset.
    pub filter: Option<String>,
}

impl Config {
    /// Load configuration from `explicit`, else AMMOSCOPE_CONFIG, else ./ammoscope.toml.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(
                std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
            ),
        };

        if !path.exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy ammoscope.example.toml to ammoscope.toml and edit it.",
                path.display()
            );
        }

        let content = std::fs::read_to_string(&path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_database_url(std::env::var(DATABASE_URL_ENV).ok());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// A non-empty override replaces whatever the file configured.
    pub fn apply_database_url(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.store.url = Some(SecretString::from(url));
        }
    }
}
