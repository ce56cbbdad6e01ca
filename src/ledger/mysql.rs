//! MySQL/MariaDB ledger, the production store.
//!
//! The connection is opened once per run and shared with the CMS sink, so
//! the pool is capped at a single connection.

use super::{Ledger, ledger_key};
use crate::config::DbConfig;
use crate::error::LedgerError;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::{info, instrument};

/// Open the connection described by `config`.
#[instrument(level = "info", skip_all, fields(host = %config.host, port = config.port, database = %config.database))]
pub async fn connect_pool(config: &DbConfig) -> Result<MySqlPool, LedgerError> {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);
    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    info!("Connected to MySQL");
    Ok(pool)
}

pub struct MySqlLedger {
    pool: MySqlPool,
}

impl MySqlLedger {
    /// Wrap an open pool and create the ledger table if absent.
    pub async fn new(pool: MySqlPool) -> Result<Self, LedgerError> {
        sqlx::query("CREATE TABLE IF NOT EXISTS articles (url VARCHAR(191) PRIMARY KEY)")
            .execute(&pool)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Ledger for MySqlLedger {
    async fn contains(&self, url: &str) -> Result<bool, LedgerError> {
        let found: Option<String> = sqlx::query_scalar("SELECT url FROM articles WHERE url = ?")
            .bind(ledger_key(url))
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn record(&self, url: &str) -> Result<(), LedgerError> {
        self.claim(url).await.map(|_| ())
    }

    async fn claim(&self, url: &str) -> Result<bool, LedgerError> {
        let result = sqlx::query("INSERT IGNORE INTO articles (url) VALUES (?)")
            .bind(ledger_key(url))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
