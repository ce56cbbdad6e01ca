//! Delivery of extracted articles.
//!
//! Every target implements [`Sink`]. The crawler only talks to [`Sinks`],
//! which fans each call out to whatever the configuration enabled and logs
//! failures without letting one target block the others.
//!
//! # Submodules
//!
//! - [`json`]: one JSON array per site, rewritten every run
//! - [`files`]: one text file per article
//! - [`webhook`]: one POST per article as it is extracted
//! - [`managed`]: one draft post row per article in a CMS table
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── news.example.json                         # json
//! └── https:__news.example_articles_1.txt       # files
//! ```

pub mod files;
pub mod json;
pub mod managed;
pub mod webhook;

use crate::config::HarvestConfig;
use crate::error::SinkError;
use crate::models::Article;
use async_trait::async_trait;
use reqwest::Client;
use sqlx::MySqlPool;
use tracing::{error, info};

#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once per article, right after its content was extracted.
    async fn deliver_article(&self, _site: &str, _article: &Article) -> Result<(), SinkError> {
        Ok(())
    }

    /// Called once per site with every article that produced content.
    async fn deliver_site(&self, _site: &str, _articles: &[Article]) -> Result<(), SinkError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct Sinks {
    sinks: Vec<Box<dyn Sink>>,
}

impl Sinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Build the targets enabled in `config`. `mysql` is the store
    /// connection, required for CMS inserts.
    pub fn from_config(config: &HarvestConfig, client: Client, mysql: Option<MySqlPool>) -> Self {
        let mut sinks = Sinks::new();
        if config.sinks.aggregate {
            sinks = sinks.with(json::AggregateFileSink::new(&config.output_dir));
        }
        if config.sinks.per_article {
            sinks = sinks.with(files::ArticleFileSink::new(&config.output_dir));
        }
        if let Some(url) = config.post_url.as_deref().filter(|u| !u.is_empty()) {
            sinks = sinks.with(webhook::WebhookSink::new(client, url));
        }
        if let (Some(managed), Some(pool)) = (&config.sinks.managed_content, mysql) {
            sinks = sinks.with(managed::ManagedContentSink::new(pool, managed.clone()));
        }
        info!(sinks = ?sinks.names(), "Delivery targets");
        sinks
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Hand one article to every sink. Returns `true` when none failed.
    pub async fn deliver_article(&self, site: &str, article: &Article) -> bool {
        let mut ok = true;
        for sink in &self.sinks {
            if let Err(e) = sink.deliver_article(site, article).await {
                error!(sink = sink.name(), url = %article.url, error = %e, "Article delivery failed");
                ok = false;
            }
        }
        ok
    }

    /// Hand a finished site to every sink. Returns `true` when none failed.
    pub async fn deliver_site(&self, site: &str, articles: &[Article]) -> bool {
        let mut ok = true;
        for sink in &self.sinks {
            if let Err(e) = sink.deliver_site(site, articles).await {
                error!(sink = sink.name(), %site, error = %e, "Site delivery failed");
                ok = false;
            }
        }
        ok
    }
}
