use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:setlist.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Connection settings for the backing SQLite store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    /// Reads `DATABASE_URL`, `SETLIST_MAX_CONNECTIONS` and
    /// `SETLIST_BUSY_TIMEOUT_MS`, falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(raw) = env::var("SETLIST_MAX_CONNECTIONS") {
            config.max_connections = raw
                .parse()
                .with_context(|| format!("SETLIST_MAX_CONNECTIONS is not a number: {}", raw))?;
        }
        if let Ok(raw) = env::var("SETLIST_BUSY_TIMEOUT_MS") {
            let ms: u64 = raw
                .parse()
                .with_context(|| format!("SETLIST_BUSY_TIMEOUT_MS is not a number: {}", raw))?;
            config.busy_timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// Accepts both `sqlite:` URLs and bare file paths.
    pub(crate) fn connect_url(&self) -> String {
        if self.database_url.starts_with("sqlite:") {
            self.database_url.clone()
        } else {
            format!("sqlite:{}", self.database_url)
        }
    }

    pub(crate) fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}
