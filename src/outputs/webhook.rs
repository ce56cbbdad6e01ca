//! Remote delivery: one JSON POST per article.
//!
//! Only transport success counts; the response status and body are logged
//! but not interpreted.

use super::Sink;
use crate::error::SinkError;
use crate::models::Article;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, instrument};

pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Sink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    #[instrument(level = "info", skip_all, fields(endpoint = %self.url, url = %article.url))]
    async fn deliver_article(&self, _site: &str, article: &Article) -> Result<(), SinkError> {
        let response = self.client.post(&self.url).json(article).send().await?;
        info!(status = response.status().as_u16(), "Posted article");
        Ok(())
    }
}
