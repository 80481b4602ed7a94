use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::websocket::manager::ChannelRegistry;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqlitePool};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub channels: ChannelRegistry,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: AppConfig) -> Self {
        Self {
            db_pool,
            config: Arc::new(config),
            channels: ChannelRegistry::new(),
        }
    }

    pub async fn conn(&self) -> AppResult<PoolConnection<Sqlite>> {
        self.db_pool
            .acquire()
            .await
            .map_err(|e| AppError::database(e, "Failed to acquire database connection"))
    }
}
