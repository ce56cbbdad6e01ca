//! Draft posts in a WordPress-style `posts` table.
//!
//! Uses the same MySQL connection as the ledger. Every article becomes one
//! row with status `draft`, comments and pings closed, and both date columns
//! set to the current UTC time.

use super::Sink;
use crate::config::ManagedContentConfig;
use crate::error::SinkError;
use crate::models::Article;
use crate::utils::slugify_title;
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::MySqlPool;
use tracing::{info, instrument};

const TITLE_MAX_CHARS: usize = 120;
const SLUG_MAX_CHARS: usize = 200;

/// Column values for one inserted post.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedPost {
    pub author: u64,
    pub date: NaiveDateTime,
    pub date_gmt: NaiveDateTime,
    pub content: String,
    pub title: String,
    pub slug: String,
    pub guid: String,
    pub post_type: String,
}

impl ManagedPost {
    pub fn from_article(article: &Article, config: &ManagedContentConfig, now: NaiveDateTime) -> Self {
        let title = title_for(article);
        let slug: String = slugify_title(&title).chars().take(SLUG_MAX_CHARS).collect();
        Self {
            author: config.author_id,
            date: now,
            date_gmt: now,
            content: article.content.clone(),
            title,
            slug,
            guid: article.url.clone(),
            post_type: config.post_type.clone(),
        }
    }
}

/// First non-blank line of the content, falling back to the URL.
fn title_for(article: &Article) -> String {
    article
        .content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(article.url.as_str())
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect()
}

/// Table identifiers cannot be bound, so the prefix is restricted to
/// identifier characters.
fn posts_table(prefix: &str) -> String {
    let prefix: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    format!("{prefix}posts")
}

fn insert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table} (post_author, post_date, post_date_gmt, post_content, post_title, \
         post_excerpt, post_status, comment_status, ping_status, post_name, to_ping, pinged, \
         post_modified, post_modified_gmt, post_content_filtered, post_parent, guid, menu_order, \
         post_type) \
         VALUES (?, ?, ?, ?, ?, '', 'draft', 'closed', 'closed', ?, '', '', ?, ?, '', 0, ?, 0, ?)"
    )
}

pub struct ManagedContentSink {
    pool: MySqlPool,
    config: ManagedContentConfig,
    insert: String,
}

impl ManagedContentSink {
    pub fn new(pool: MySqlPool, config: ManagedContentConfig) -> Self {
        let insert = insert_sql(&posts_table(&config.table_prefix));
        Self {
            pool,
            config,
            insert,
        }
    }
}

#[async_trait]
impl Sink for ManagedContentSink {
    fn name(&self) -> &'static str {
        "managed-content"
    }

    #[instrument(level = "info", skip_all, fields(url = %article.url))]
    async fn deliver_article(&self, _site: &str, article: &Article) -> Result<(), SinkError> {
        let post = ManagedPost::from_article(article, &self.config, Utc::now().naive_utc());
        let result = sqlx::query(&self.insert)
            .bind(post.author)
            .bind(post.date)
            .bind(post.date_gmt)
            .bind(&post.content)
            .bind(&post.title)
            .bind(&post.slug)
            .bind(post.date)
            .bind(post.date_gmt)
            .bind(&post.guid)
            .bind(&post.post_type)
            .execute(&self.pool)
            .await?;
        info!(id = result.last_insert_id(), slug = %post.slug, "Inserted draft post");
        Ok(())
    }
}
