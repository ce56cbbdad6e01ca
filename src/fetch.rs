//! HTTP retrieval of landing pages and articles.
//!
//! A single attempt per URL. Redirects are followed by the client; non-2xx
//! responses are returned to the caller with their body rather than being
//! turned into errors. Bodies are decoded with the charset named in the
//! response's `Content-Type`, falling back to UTF-8.

use crate::error::FetchError;
use reqwest::{Client, StatusCode, redirect};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Identifying user agent sent with every request.
pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; article_harvester/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// A decoded response body together with its HTTP status.
#[derive(Debug)]
pub struct Fetched {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::limited(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// The underlying client, shared with the webhook sink.
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[instrument(level = "info", skip(self), fields(%url))]
    pub async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            info!(status = status.as_u16(), bytes = body.len(), "Downloaded");
        } else {
            warn!(status = status.as_u16(), bytes = body.len(), "Non-success status");
        }
        Ok(Fetched { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_fetch_sets_user_agent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .match_header("user-agent", Matcher::Regex("^Mozilla/5.0".to_string()))
            .with_status(200)
            .with_body("<html>ok</html>")
            .expect(1)
            .create_async()
            .await;

        let fetcher = Fetcher::new().unwrap();
        let fetched = fetcher.fetch(&format!("{}/page", server.url())).await.unwrap();
        assert_eq!(fetched.status, StatusCode::OK);
        assert_eq!(fetched.body, "<html>ok</html>");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_follows_redirects() {
        let mut server = Server::new_async().await;
        let target = format!("{}/new", server.url());
        let _old = server
            .mock("GET", "/old")
            .with_status(301)
            .with_header("location", &target)
            .create_async()
            .await;
        let _new = server
            .mock("GET", "/new")
            .with_status(200)
            .with_body("moved")
            .create_async()
            .await;

        let fetcher = Fetcher::new().unwrap();
        let fetched = fetcher.fetch(&format!("{}/old", server.url())).await.unwrap();
        assert_eq!(fetched.status, StatusCode::OK);
        assert_eq!(fetched.body, "moved");
    }

    #[tokio::test]
    async fn test_non_success_is_not_an_error() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("gone")
            .create_async()
            .await;

        let fetcher = Fetcher::new().unwrap();
        let fetched = fetcher
            .fetch(&format!("{}/missing", server.url()))
            .await
            .unwrap();
        assert_eq!(fetched.status, StatusCode::NOT_FOUND);
        assert_eq!(fetched.body, "gone");
    }

    #[tokio::test]
    async fn test_decodes_declared_charset() {
        let mut server = Server::new_async().await;
        // "Привет" in windows-1251
        let body: &[u8] = b"<p>\xcf\xf0\xe8\xe2\xe5\xf2</p>";
        let _page = server
            .mock("GET", "/cp1251")
            .with_status(200)
            .with_header("content-type", "text/html; charset=windows-1251")
            .with_body(body)
            .create_async()
            .await;

        let fetcher = Fetcher::new().unwrap();
        let fetched = fetcher.fetch(&format!("{}/cp1251", server.url())).await.unwrap();
        assert_eq!(fetched.body, "<p>Привет</p>");
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let fetcher = Fetcher::new().unwrap();
        let err = fetcher.fetch("http://127.0.0.1:1/unreachable").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
