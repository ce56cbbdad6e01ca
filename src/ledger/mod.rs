//! Persistent record of article URLs that have already been processed.
//!
//! The crawler claims a URL before fetching it. A crash mid-fetch can lose
//! that one article's content, but the URL is never fetched twice.
//!
//! Backends:
//! - [`MemoryLedger`]: process-local set, for tests
//! - [`SqliteLedger`]: single file, for one-host deployments
//! - [`MySqlLedger`]: MySQL/MariaDB, the production store

pub mod memory;
pub mod mysql;
pub mod sqlite;

pub use memory::MemoryLedger;
pub use mysql::MySqlLedger;
pub use sqlite::SqliteLedger;

use crate::config::{DbBackend, DbConfig};
use crate::error::LedgerError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::MySqlPool;
use std::sync::Arc;

/// Longest URL the ledger table accepts.
pub const MAX_URL_LEN: usize = 191;

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Whether `url` was recorded by this or any earlier run.
    async fn contains(&self, url: &str) -> Result<bool, LedgerError>;

    /// Record `url`. Recording a URL twice is a no-op.
    async fn record(&self, url: &str) -> Result<(), LedgerError>;

    /// Record `url` if absent and report whether this call inserted it.
    ///
    /// `true` means the caller owns the URL and should fetch it; `false`
    /// means it was already seen.
    async fn claim(&self, url: &str) -> Result<bool, LedgerError>;
}

/// The persistent store for one run: the ledger, plus the MySQL connection
/// when that backend is in use so CMS inserts can share it.
pub struct Store {
    pub ledger: Arc<dyn Ledger>,
    pub mysql: Option<MySqlPool>,
}

/// Connect to the backend named in the configuration and make sure the
/// ledger table exists.
pub async fn open_store(config: &DbConfig) -> Result<Store, LedgerError> {
    match config.backend {
        DbBackend::Mysql => {
            let pool = mysql::connect_pool(config).await?;
            let ledger = MySqlLedger::new(pool.clone()).await?;
            Ok(Store {
                ledger: Arc::new(ledger),
                mysql: Some(pool),
            })
        }
        DbBackend::Sqlite => {
            let path = config.path.as_deref().unwrap_or("harvester.db");
            Ok(Store {
                ledger: Arc::new(SqliteLedger::open(path).await?),
                mysql: None,
            })
        }
    }
}

/// The key stored for `url`. URLs that fit the column are stored as-is;
/// longer ones keep a readable prefix followed by `#` and the SHA-256 of the
/// full URL, so distinct URLs never share a key.
pub(crate) fn ledger_key(url: &str) -> String {
    if url.len() <= MAX_URL_LEN {
        return url.to_string();
    }
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    let mut end = MAX_URL_LEN - digest.len() - 1;
    while !url.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}#{digest}", &url[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_key_fits_column() {
        let long = format!("https://x.test/{}", "a".repeat(300));
        let key = ledger_key(&long);
        assert_eq!(key.len(), MAX_URL_LEN);
        assert!(key.starts_with("https://x.test/aaa"));
        assert_eq!(ledger_key("https://x.test/a"), "https://x.test/a");

        let cyrillic = format!("https://x.test/{}", "ж".repeat(200));
        assert!(ledger_key(&cyrillic).len() <= MAX_URL_LEN);
    }

    #[test]
    fn test_long_urls_with_shared_prefix_get_distinct_keys() {
        let prefix = format!("https://x.test/{}", "p".repeat(200));
        let a = format!("{prefix}/first");
        let b = format!("{prefix}/second");
        assert_ne!(ledger_key(&a), ledger_key(&b));
        assert_eq!(ledger_key(&a), ledger_key(&format!("{prefix}/first")));
    }

    #[tokio::test]
    async fn test_claim_distinguishes_long_urls() {
        let prefix = format!("https://x.test/{}", "p".repeat(200));
        let ledger = MemoryLedger::new();
        assert!(ledger.claim(&format!("{prefix}/first")).await.unwrap());
        assert!(ledger.claim(&format!("{prefix}/second")).await.unwrap());
        assert!(!ledger.claim(&format!("{prefix}/first")).await.unwrap());
    }
}
