//! SQLite ledger. One file, one connection.

use super::{Ledger, ledger_key};
use crate::error::LedgerError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, instrument};

pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open (creating if needed) the database file at `path`.
    #[instrument(level = "info")]
    pub async fn open(path: &str) -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let ledger = Self { pool };
        ledger.run_migrations().await?;
        info!("SQLite ledger ready");
        Ok(ledger)
    }

    /// In-memory database, for tests. A single connection keeps every query
    /// on the same database.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, LedgerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let ledger = Self { pool };
        ledger.run_migrations().await?;
        Ok(ledger)
    }

    async fn run_migrations(&self) -> Result<(), LedgerError> {
        sqlx::query("CREATE TABLE IF NOT EXISTS articles (url VARCHAR(191) PRIMARY KEY)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn contains(&self, url: &str) -> Result<bool, LedgerError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE url = ?")
            .bind(ledger_key(url))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn record(&self, url: &str) -> Result<(), LedgerError> {
        self.claim(url).await.map(|_| ())
    }

    async fn claim(&self, url: &str) -> Result<bool, LedgerError> {
        let result = sqlx::query("INSERT OR IGNORE INTO articles (url) VALUES (?)")
            .bind(ledger_key(url))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_twice_keeps_single_row() {
        let ledger = SqliteLedger::in_memory().await.unwrap();
        ledger.record("https://x.test/a/1").await.unwrap();
        ledger.record("https://x.test/a/1").await.unwrap();
        assert!(ledger.contains("https://x.test/a/1").await.unwrap());

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&ledger.pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_claim_reports_first_insert_only() {
        let ledger = SqliteLedger::in_memory().await.unwrap();
        assert!(!ledger.contains("https://x.test/b").await.unwrap());
        assert!(ledger.claim("https://x.test/b").await.unwrap());
        assert!(!ledger.claim("https://x.test/b").await.unwrap());
    }

    #[tokio::test]
    async fn test_quotes_in_urls_are_bound_not_spliced() {
        let ledger = SqliteLedger::in_memory().await.unwrap();
        let url = "https://x.test/it's'); DROP TABLE articles;--";
        assert!(ledger.claim(url).await.unwrap());
        assert!(ledger.contains(url).await.unwrap());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ledger.db");
        let path = path.to_str().unwrap();

        let first = SqliteLedger::open(path).await.unwrap();
        first.record("https://x.test/seen").await.unwrap();
        first.pool.close().await;

        let second = SqliteLedger::open(path).await.unwrap();
        assert!(second.contains("https://x.test/seen").await.unwrap());
        assert!(!second.claim("https://x.test/seen").await.unwrap());
    }

    #[tokio::test]
    async fn test_long_urls_sharing_a_prefix_are_distinct() {
        let ledger = SqliteLedger::in_memory().await.unwrap();
        let prefix = format!("https://x.test/{}", "p".repeat(200));
        assert!(ledger.claim(&format!("{prefix}/first")).await.unwrap());
        assert!(ledger.claim(&format!("{prefix}/second")).await.unwrap());
        assert!(ledger.contains(&format!("{prefix}/first")).await.unwrap());
    }
}
