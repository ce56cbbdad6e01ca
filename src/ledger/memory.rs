//! In-memory ledger for testing. Nothing survives the process.

use super::{Ledger, ledger_key};
use crate::error::LedgerError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryLedger {
    urls: RwLock<HashSet<String>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger pre-populated with `urls`, as if recorded by an earlier run.
    pub fn with_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: RwLock::new(urls.into_iter().map(Into::into).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.urls.read().unwrap().len()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn contains(&self, url: &str) -> Result<bool, LedgerError> {
        Ok(self.urls.read().unwrap().contains(&ledger_key(url)))
    }

    async fn record(&self, url: &str) -> Result<(), LedgerError> {
        self.urls.write().unwrap().insert(ledger_key(url));
        Ok(())
    }

    async fn claim(&self, url: &str) -> Result<bool, LedgerError> {
        Ok(self.urls.write().unwrap().insert(ledger_key(url)))
    }
}
