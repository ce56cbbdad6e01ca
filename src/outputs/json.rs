//! Per-site aggregate JSON file.
//!
//! Each run rewrites `{output_dir}/{site_host}.json` with a JSON array of
//! `{"url": ..., "content": ...}` objects, one per article that yielded
//! content.

use super::Sink;
use crate::error::SinkError;
use crate::models::Article;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

pub struct AggregateFileSink {
    output_dir: PathBuf,
}

impl AggregateFileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path_for(&self, site: &str) -> PathBuf {
        self.output_dir.join(format!("{site}.json"))
    }
}

#[async_trait]
impl Sink for AggregateFileSink {
    fn name(&self) -> &'static str {
        "aggregate-file"
    }

    #[instrument(level = "info", skip_all, fields(%site, count = articles.len()))]
    async fn deliver_site(&self, site: &str, articles: &[Article]) -> Result<(), SinkError> {
        let json = serde_json::to_string_pretty(articles)?;
        fs::create_dir_all(&self.output_dir).await?;
        let path = self.path_for(site);
        fs::write(&path, json).await?;
        info!(path = %path.display(), "Wrote site results");
        Ok(())
    }
}
