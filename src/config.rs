use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variables that make up the required database surface.
pub const DB_HOST_VAR: &str = "DB_HOST";
pub const DB_NAME_VAR: &str = "DB_NAME";
pub const DB_USER_VAR: &str = "DB_USER";
pub const DB_PASSWORD_VAR: &str = "DB_PASSWORD";

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub processor: ProcessorConfig,
}

/// Database location and identity, read from the environment.
///
/// `host` is the directory holding the store and `name` its file stem, so the
/// store lives at `<host>/<name>.db`. A file store has no use for
/// `DB_PASSWORD`; it is required to be set but never kept.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: PathBuf,
    pub name: String,
    pub user: String,
}

/// Batch tuning, read from the optional TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    processor: ProcessorConfig,
}

fn default_batch_size() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DatabaseConfig {
    /// Read the database surface from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the database surface through `lookup`; every value is required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => anyhow::bail!(
                    "Environment variable {} not set. Set it in your .env file or as an environment variable.",
                    key
                ),
            }
        };

        let config = Self {
            host: PathBuf::from(required(DB_HOST_VAR)?),
            name: required(DB_NAME_VAR)?,
            user: required(DB_USER_VAR)?,
        };
        required(DB_PASSWORD_VAR)?;
        Ok(config)
    }

    /// Full path to the SQLite store
    pub fn store_path(&self) -> PathBuf {
        self.host.join(format!("{}.db", self.name))
    }
}

impl Config {
    /// Load configuration
    ///
    /// Loads a `.env` file (if present) first, then reads the database surface
    /// from the environment and processor tuning from the TOML file named by
    /// `TOPOMAP_CONFIG`, falling back to `./topomap.toml`.
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let database = DatabaseConfig::from_env()?;

        let processor = match std::env::var("TOPOMAP_CONFIG") {
            Ok(path) => load_processor_config(Path::new(&path))?,
            Err(_) => {
                let default_path = Path::new("topomap.toml");
                if default_path.exists() {
                    load_processor_config(default_path)?
                } else {
                    ProcessorConfig::default()
                }
            }
        };

        let config = Config { database, processor };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.processor.batch_size == 0 {
            anyhow::bail!("processor.batch_size must be greater than 0");
        }
        if self.database.name.contains(['/', '\\']) {
            anyhow::bail!("{} must be a plain name, not a path", DB_NAME_VAR);
        }
        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> PathBuf {
        self.database.store_path()
    }
}

fn load_processor_config(path: &Path) -> Result<ProcessorConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let file: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(file.processor)
}
