use anyhow::Result;
use log::info;
use sqlx::SqlitePool;

use crate::config::StoreConfig;
use crate::db;

/// Handle to an opened and migrated store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Store {
    pub(crate) pool: SqlitePool,
}

impl Store {
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let pool = db::open_pool(config).await?;
        db::init_database(&pool).await?;
        info!("Store ready at {}", config.database_url);
        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self> {
        Self::open(&StoreConfig::new("sqlite::memory:")).await
    }

    /// Remove every workout, set and exercise.
    pub async fn clear(&self) -> Result<()> {
        db::clear_all(&self.pool).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
