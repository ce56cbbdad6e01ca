//! Run configuration: the site list, pacing, delivery targets and the
//! connection parameters of the URL ledger.
//!
//! Files are JSON unless the extension is `.yaml` or `.yml`. Keys from older
//! deployments (`content_block`, `max_pages`) are accepted as aliases.
//!
//! ```json
//! {
//!   "sites": [
//!     { "url": "https://news.example/latest",
//!       "link_pattern": "//div[contains(@class,'teaser')]/a/@href",
//!       "content_locator": "article-body",
//!       "max_articles": 5 }
//!   ],
//!   "output_dir": "output",
//!   "request_delay": 1,
//!   "post_url": "https://hooks.example/articles",
//!   "db": { "host": "localhost", "user": "root", "database": "cyberlaw" }
//! }
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

fn default_max_articles() -> usize {
    10
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_request_delay() -> u64 {
    1
}

fn default_true() -> bool {
    true
}

/// One site to harvest. Immutable for the duration of a run.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SiteSpec {
    /// Landing page listing the articles.
    pub url: String,
    /// Structural path expression or textual rule selecting article links.
    pub link_pattern: String,
    /// Extra textual rule applied to the hrefs a structural pattern selects.
    #[serde(default)]
    pub link_filter: Option<String>,
    /// Class token or path expression locating the article body.
    #[serde(alias = "content_block")]
    pub content_locator: String,
    #[serde(default = "default_max_articles", alias = "max_pages")]
    pub max_articles: usize,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbBackend {
    #[default]
    Mysql,
    Sqlite,
}

/// Connection parameters of the persistent store.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DbConfig {
    pub backend: DbBackend,
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
    /// Database file, only used by the `sqlite` backend.
    pub path: Option<String>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: DbBackend::Mysql,
            host: "localhost".to_string(),
            user: "root".to_string(),
            password: String::new(),
            database: "cyberlaw".to_string(),
            port: 3306,
            path: None,
        }
    }
}

/// Settings for inserting articles as draft posts into a CMS table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManagedContentConfig {
    pub author_id: u64,
    pub table_prefix: String,
    pub post_type: String,
}

impl Default for ManagedContentConfig {
    fn default() -> Self {
        Self {
            author_id: 1,
            table_prefix: "wp_".to_string(),
            post_type: "post".to_string(),
        }
    }
}

/// Which delivery targets are active. `post_url` on [`HarvestConfig`]
/// separately enables the webhook.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SinkConfig {
    #[serde(default = "default_true")]
    pub aggregate: bool,
    #[serde(default)]
    pub per_article: bool,
    #[serde(default)]
    pub managed_content: Option<ManagedContentConfig>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            aggregate: true,
            per_article: false,
            managed_content: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HarvestConfig {
    pub sites: Vec<SiteSpec>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Seconds to wait after every article request and between sites.
    #[serde(default = "default_request_delay")]
    pub request_delay: u64,
    #[serde(default)]
    pub post_url: Option<String>,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub sinks: SinkConfig,
}

impl HarvestConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay)
    }

    /// Reject sites the crawler could never process.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, site) in self.sites.iter().enumerate() {
            let reason = match Url::parse(&site.url) {
                Err(e) => Some(format!("url `{}` is not absolute: {e}", site.url)),
                Ok(_) if site.link_pattern.trim().is_empty() => {
                    Some("link_pattern is empty".to_string())
                }
                Ok(_) if site.content_locator.trim().is_empty() => {
                    Some("content_locator is empty".to_string())
                }
                Ok(_) => None,
            };
            if let Some(reason) = reason {
                return Err(ConfigError::Site { index, reason });
            }
        }
        if self.db.backend == DbBackend::Sqlite && self.db.path.is_none() {
            return Err(ConfigError::MissingSqlitePath);
        }
        if self.sinks.managed_content.is_some() && self.db.backend != DbBackend::Mysql {
            return Err(ConfigError::ManagedContentRequiresMysql);
        }
        Ok(())
    }
}

/// Parse configuration text, picking the format from the file extension.
pub fn parse_config(text: &str, path: &Path) -> Result<HarvestConfig, ConfigError> {
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let config: HarvestConfig = if yaml {
        serde_yaml::from_str(text)?
    } else {
        serde_json::from_str(text)?
    };
    config.validate()?;
    Ok(config)
}

#[instrument(level = "info", fields(path = %path.display()))]
pub async fn load_config(path: &Path) -> Result<HarvestConfig, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let config = parse_config(&text, path)?;
    for site in &config.sites {
        info!(site = %site.url, max_articles = site.max_articles, "Configured site");
    }
    info!(
        output_dir = %config.output_dir,
        request_delay = config.request_delay,
        sites = config.sites.len(),
        "Config loaded"
    );
    Ok(config)
}
