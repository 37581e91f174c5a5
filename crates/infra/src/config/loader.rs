//! Environment-first configuration loader
//!
//! A `.env` file is honoured if present, then `REPOPULSE_*` variables
//! (plus the conventional `GITHUB_TOKEN`) are read. A TOML file named by
//! `REPOPULSE_CONFIG` provides the base layer when set; environment
//! variables always win.

use std::path::Path;

use repopulse_domain::{Config, DatabaseConfig, GithubConfig, RepoPulseError, Result, SyncConfig};
use tracing::info;

const DEFAULT_DB_PATH: &str = "repopulse.db";
const DEFAULT_POOL_SIZE: u32 = 4;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the process environment, layered on top of
    /// an optional TOML file named by `REPOPULSE_CONFIG`.
    pub fn load() -> Result<Config> {
        // Absent .env files are fine.
        dotenvy::dotenv().ok();

        let base = match std::env::var("REPOPULSE_CONFIG") {
            Ok(path) => Some(Self::from_file(&path)?),
            Err(_) => None,
        };

        let config = Self::from_lookup(base, |key| std::env::var(key).ok())?;
        info!(
            database_path = %config.database.path,
            authenticated = config.github.token.is_some(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parse a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            RepoPulseError::Config(format!(
                "cannot read config file {}: {err}",
                path.as_ref().display()
            ))
        })?;
        toml::from_str(&raw)
            .map_err(|err| RepoPulseError::Config(format!("invalid config file: {err}")))
    }

    /// Build the configuration from a key lookup, layered over `base`.
    fn from_lookup(
        base: Option<Config>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Config> {
        let mut config = base.unwrap_or_else(|| Config {
            database: DatabaseConfig {
                path: DEFAULT_DB_PATH.to_string(),
                pool_size: DEFAULT_POOL_SIZE,
            },
            github: GithubConfig::unauthenticated(),
            sync: SyncConfig::default(),
        });

        if let Some(path) = lookup("REPOPULSE_DATABASE_PATH") {
            config.database.path = path;
        }
        if let Some(size) = lookup("REPOPULSE_DATABASE_POOL_SIZE") {
            config.database.pool_size = parse(&size, "REPOPULSE_DATABASE_POOL_SIZE")?;
        }
        if let Some(token) = lookup("GITHUB_TOKEN").filter(|t| !t.is_empty()) {
            config.github.token = Some(token);
        }
        if let Some(url) = lookup("REPOPULSE_GITHUB_BASE_URL") {
            config.github.base_url = url;
        }
        if let Some(timeout) = lookup("REPOPULSE_GITHUB_TIMEOUT_SECS") {
            config.github.timeout_secs = parse(&timeout, "REPOPULSE_GITHUB_TIMEOUT_SECS")?;
        }
        if let Some(limit) = lookup("REPOPULSE_SYNC_CONCURRENCY") {
            config.sync.concurrency_limit = parse(&limit, "REPOPULSE_SYNC_CONCURRENCY")?;
        }
        if let Some(interval) = lookup("REPOPULSE_SYNC_PROGRESS_INTERVAL") {
            config.sync.progress_commit_interval =
                parse(&interval, "REPOPULSE_SYNC_PROGRESS_INTERVAL")?;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| RepoPulseError::Config(format!("invalid value for {key}: {value}")))
}
