//! Data models shared by the crawler, the ledger and the sinks.
//!
//! - [`Article`]: one candidate link and the text extracted from it
//! - [`ArticleStatus`]: the one-way lifecycle of an [`Article`]
//! - [`CrawlState`]: per-site working set owned by the crawler
//! - [`SiteReport`]: what a site contributed to the run

use serde::{Deserialize, Serialize};

/// Lifecycle of an article. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArticleStatus {
    /// Selected from the landing page, not yet checked against the ledger.
    Pending,
    /// Already recorded by an earlier run; skipped.
    Deduped,
    /// Fetched and extracted with non-empty content.
    Fetched,
    /// Fetch, parse or extraction produced nothing.
    ExtractFailed,
    /// Handed to every configured sink without error.
    Delivered,
}

/// An extracted `(url, content)` pair.
///
/// Only `url` and `content` are serialized, which is the record format of
/// the aggregate file and the webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub content: String,
    #[serde(skip, default = "pending")]
    pub status: ArticleStatus,
}

fn pending() -> ArticleStatus {
    ArticleStatus::Pending
}

impl Article {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: String::new(),
            status: ArticleStatus::Pending,
        }
    }

    /// Move to `next`, ignoring attempts to go backwards.
    pub fn advance(&mut self, next: ArticleStatus) {
        if next > self.status {
            self.status = next;
        }
    }

    /// Attach extracted text. Empty text marks the extraction as failed.
    pub fn set_content(&mut self, content: String) {
        if content.is_empty() {
            self.advance(ArticleStatus::ExtractFailed);
        } else {
            self.content = content;
            self.advance(ArticleStatus::Fetched);
        }
    }
}

/// Working set for one site. Dropped once results reach the sinks.
#[derive(Debug, Default)]
pub struct CrawlState {
    /// Candidate links in document order, already truncated.
    pub links: Vec<String>,
    /// Index of the link being processed.
    pub index: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl CrawlState {
    /// Keep the first `max` links in document order.
    pub fn new(mut links: Vec<String>, max: usize) -> Self {
        links.truncate(max);
        Self {
            links,
            ..Self::default()
        }
    }
}

/// Per-site outcome reported at the end of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteReport {
    pub site: String,
    /// Links found on the landing page before truncation.
    pub discovered: usize,
    /// Links that survived truncation.
    pub selected: usize,
    /// Links recorded by an earlier run.
    pub skipped: usize,
    /// Links whose fetch or extraction produced nothing.
    pub failed: usize,
    /// Articles accepted by every sink.
    pub delivered: usize,
    /// Set when the landing page itself was unusable.
    pub aborted: bool,
}
