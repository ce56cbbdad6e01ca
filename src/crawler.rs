//! The per-site crawl, extract, dedupe and deliver pipeline.
//!
//! For every site, in configuration order:
//!
//! ```text
//! fetch landing -> parse -> extract links -> truncate(max_articles)
//!   for each link: claim in ledger -> [skip | fetch -> extract -> deliver] -> delay
//! -> deliver site results
//! ```
//!
//! Sites and articles are processed strictly one at a time. A URL is claimed
//! in the ledger *before* its article is fetched, so a failed or interrupted
//! extraction is never retried by a later run.

use crate::config::SiteSpec;
use crate::document::Document;
use crate::error::ParseError;
use crate::fetch::Fetcher;
use crate::ledger::Ledger;
use crate::models::{Article, ArticleStatus, CrawlState, SiteReport};
use crate::outputs::Sinks;
use crate::scrapers::content::{ContentLocator, extract_content};
use crate::scrapers::links::{LinkRule, extract_links};
use crate::utils::{resolve_url, site_host};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

pub struct Crawler {
    fetcher: Fetcher,
    ledger: Arc<dyn Ledger>,
    sinks: Sinks,
    delay: Duration,
}

/// Parse a landing page and collect its article links. The document is
/// dropped before returning.
fn discover_links(body: &str, rule: &LinkRule) -> Result<Vec<String>, ParseError> {
    let document = Document::parse(body)?;
    Ok(extract_links(&document, rule))
}

impl Crawler {
    pub fn new(fetcher: Fetcher, ledger: Arc<dyn Ledger>, sinks: Sinks, delay: Duration) -> Self {
        Self {
            fetcher,
            ledger,
            sinks,
            delay,
        }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            debug!(delay = ?self.delay, "Waiting before next request");
            sleep(self.delay).await;
        }
    }

    /// Crawl every site in order. Never fails; problems are logged and
    /// reflected in the returned reports.
    pub async fn run(&self, sites: &[SiteSpec]) -> Vec<SiteReport> {
        info!(sites = sites.len(), "Starting crawl");
        let mut reports = Vec::with_capacity(sites.len());
        for (i, site) in sites.iter().enumerate() {
            info!(site = %site.url, "Processing site {}/{}", i + 1, sites.len());
            reports.push(self.crawl_site(site).await);
            if i + 1 < sites.len() {
                self.pause().await;
            }
        }
        reports
    }

    /// Landing-page links for `site`, or `None` when the page is unusable.
    async fn discover(&self, site: &SiteSpec) -> Option<Vec<String>> {
        let fetched = match self.fetcher.fetch(&site.url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                error!(site = %site.url, stage = "landing", error = %e, "Landing page fetch failed; skipping site");
                return None;
            }
        };
        if !fetched.status.is_success() {
            warn!(site = %site.url, stage = "landing", status = fetched.status.as_u16(), "Landing page returned an error status; reading it anyway");
        }
        let rule = LinkRule::detect(&site.link_pattern, site.link_filter.as_deref());
        match discover_links(&fetched.body, &rule) {
            Ok(links) => Some(links),
            Err(e) => {
                error!(site = %site.url, stage = "landing", error = %e, "Landing page parse failed; skipping site");
                None
            }
        }
    }

    #[instrument(level = "info", skip_all, fields(site = %site.url))]
    pub async fn crawl_site(&self, site: &SiteSpec) -> SiteReport {
        let host = site_host(&site.url);
        let mut report = SiteReport {
            site: site.url.clone(),
            ..SiteReport::default()
        };

        let Some(links) = self.discover(site).await else {
            report.aborted = true;
            return report;
        };
        report.discovered = links.len();
        if links.len() > site.max_articles {
            info!(
                from = links.len(),
                to = site.max_articles,
                "Limiting articles to max_articles"
            );
        }

        let mut state = CrawlState::new(links, site.max_articles);
        report.selected = state.links.len();
        let locator = ContentLocator::detect(&site.content_locator);
        let mut collected: Vec<Article> = Vec::new();

        while state.index < state.links.len() {
            let link = &state.links[state.index];
            state.index += 1;
            let url = resolve_url(&site.url, link);
            let mut article = Article::new(url.as_str());

            match self.ledger.claim(&url).await {
                Ok(true) => {}
                Ok(false) => {
                    article.advance(ArticleStatus::Deduped);
                    state.skipped += 1;
                    info!(%url, "Already processed; skipping");
                    continue;
                }
                Err(e) => {
                    error!(%url, stage = "ledger", error = %e, "Ledger unavailable; skipping article");
                    state.failed += 1;
                    continue;
                }
            }

            info!(%url, "Processing article {}/{}", state.index, state.links.len());
            let content = extract_content(&self.fetcher, &site.url, &url, &locator).await;
            article.set_content(content);

            if article.status == ArticleStatus::ExtractFailed {
                warn!(%url, stage = "extract", "Empty content; not delivering");
                state.failed += 1;
            } else {
                if self.sinks.deliver_article(&host, &article).await {
                    article.advance(ArticleStatus::Delivered);
                    state.succeeded += 1;
                }
                collected.push(article);
            }

            self.pause().await;
        }

        if !self.sinks.deliver_site(&host, &collected).await {
            error!(site = %site.url, "Site results were not fully delivered");
        }

        report.skipped = state.skipped;
        report.failed = state.failed;
        report.delivered = state.succeeded;
        info!(
            discovered = report.discovered,
            selected = report.selected,
            skipped = report.skipped,
            failed = report.failed,
            delivered = report.delivered,
            "Finished site: {}/{} articles delivered",
            report.delivered,
            report.selected
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::outputs::json::AggregateFileSink;
    use crate::outputs::testing::RecordingSink;
    use mockito::{Mock, Server, ServerGuard};

    fn landing(links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|href| format!("<a href=\"{href}\">link</a>"))
            .collect();
        format!("<html><body><a href=\"/about\">About</a>{anchors}</body></html>")
    }

    fn article_page(text: &str) -> String {
        format!("<html><body><div class=\"story\">{text}</div></body></html>")
    }

    async fn mock_page(server: &mut ServerGuard, path: &str, body: String, hits: usize) -> Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    fn site(server: &ServerGuard, max_articles: usize) -> SiteSpec {
        SiteSpec {
            url: format!("{}/news", server.url()),
            link_pattern: "//a".to_string(),
            link_filter: Some("/articles/".to_string()),
            content_locator: "story".to_string(),
            max_articles,
        }
    }

    fn crawler(ledger: Arc<dyn Ledger>, sinks: Sinks) -> Crawler {
        Crawler::new(Fetcher::new().unwrap(), ledger, sinks, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_bare_anchor_pattern_honours_filter() {
        let mut server = Server::new_async().await;
        let links = ["/articles/1", "/articles/2", "/articles/3"];
        let _landing = mock_page(&mut server, "/news", landing(&links), 1).await;
        let about = mock_page(&mut server, "/news/about", article_page("About us"), 0).await;
        let _first = mock_page(&mut server, "/news/articles/1", article_page("One"), 1).await;
        let _second = mock_page(&mut server, "/news/articles/2", article_page("Two"), 1).await;

        let spec = SiteSpec {
            link_pattern: "a".to_string(),
            ..site(&server, 2)
        };
        let recorder = RecordingSink::default();
        let crawler = crawler(Arc::new(MemoryLedger::new()), Sinks::new().with(recorder.clone()));
        let report = crawler.crawl_site(&spec).await;

        assert_eq!(report.discovered, 3);
        assert_eq!(report.delivered, 2);
        let delivered: Vec<String> = recorder
            .articles
            .lock()
            .unwrap()
            .iter()
            .map(|(_, url)| url.clone())
            .collect();
        assert_eq!(
            delivered,
            vec![
                format!("{}/news/articles/1", server.url()),
                format!("{}/news/articles/2", server.url()),
            ]
        );
        about.assert_async().await;
    }

    #[tokio::test]
    async fn test_truncates_to_max_articles_in_document_order() {
        let mut server = Server::new_async().await;
        let links = ["/articles/1", "/articles/2", "/articles/3"];
        let _landing = mock_page(&mut server, "/news", landing(&links), 1).await;
        let first = mock_page(&mut server, "/news/articles/1", article_page("One"), 1).await;
        let second = mock_page(&mut server, "/news/articles/2", article_page("Two"), 1).await;
        let third = mock_page(&mut server, "/news/articles/3", article_page("Three"), 0).await;

        let recorder = RecordingSink::default();
        let crawler = crawler(Arc::new(MemoryLedger::new()), Sinks::new().with(recorder.clone()));
        let report = crawler.crawl_site(&site(&server, 2)).await;

        assert_eq!(report.discovered, 3);
        assert_eq!(report.selected, 2);
        assert_eq!(report.delivered, 2);
        let delivered: Vec<String> = recorder
            .articles
            .lock()
            .unwrap()
            .iter()
            .map(|(_, url)| url.clone())
            .collect();
        assert_eq!(
            delivered,
            vec![
                format!("{}/news/articles/1", server.url()),
                format!("{}/news/articles/2", server.url()),
            ]
        );
        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
    }

    #[tokio::test]
    async fn test_urls_from_prior_runs_are_not_fetched() {
        let mut server = Server::new_async().await;
        let _landing =
            mock_page(&mut server, "/news", landing(&["/articles/1", "/articles/2"]), 1).await;
        let seen = mock_page(&mut server, "/news/articles/1", article_page("One"), 0).await;
        let fresh = mock_page(&mut server, "/news/articles/2", article_page("Two"), 1).await;

        let ledger = MemoryLedger::with_urls([format!("{}/news/articles/1", server.url())]);
        let crawler = crawler(Arc::new(ledger), Sinks::new());
        let report = crawler.crawl_site(&site(&server, 10)).await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.delivered, 1);
        seen.assert_async().await;
        fresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_extraction_is_recorded_but_not_delivered() {
        let mut server = Server::new_async().await;
        let _landing = mock_page(&mut server, "/news", landing(&["/articles/1"]), 2).await;
        let page = mock_page(
            &mut server,
            "/news/articles/1",
            "<html><body><p>no story here</p></body></html>".to_string(),
            1,
        )
        .await;

        let ledger = Arc::new(MemoryLedger::new());
        let recorder = RecordingSink::default();
        let crawler = crawler(ledger.clone(), Sinks::new().with(recorder.clone()));
        let spec = site(&server, 10);

        let first = crawler.crawl_site(&spec).await;
        assert_eq!(first.failed, 1);
        assert_eq!(first.delivered, 0);
        assert!(recorder.articles.lock().unwrap().is_empty());
        assert_eq!(*recorder.sites.lock().unwrap(), vec![(site_host(&spec.url), 0)]);
        assert!(
            ledger
                .contains(&format!("{}/news/articles/1", server.url()))
                .await
                .unwrap()
        );

        let second = crawler.crawl_site(&spec).await;
        assert_eq!(second.skipped, 1);
        page.assert_async().await;
    }

    #[tokio::test]
    async fn test_landing_failure_moves_on_to_next_site() {
        let mut server = Server::new_async().await;
        let _landing = mock_page(&mut server, "/news", landing(&["/articles/1"]), 1).await;
        let _article = mock_page(&mut server, "/news/articles/1", article_page("One"), 1).await;

        let unreachable = SiteSpec {
            url: "http://127.0.0.1:1/news".to_string(),
            ..site(&server, 10)
        };
        let crawler = crawler(Arc::new(MemoryLedger::new()), Sinks::new());
        let reports = crawler.run(&[unreachable, site(&server, 10)]).await;

        assert_eq!(reports.len(), 2);
        assert!(reports[0].aborted);
        assert_eq!(reports[0].delivered, 0);
        assert!(!reports[1].aborted);
        assert_eq!(reports[1].delivered, 1);
    }

    #[tokio::test]
    async fn test_empty_landing_page_aborts_site() {
        let mut server = Server::new_async().await;
        let _landing = mock_page(&mut server, "/news", String::new(), 1).await;

        let crawler = crawler(Arc::new(MemoryLedger::new()), Sinks::new());
        let report = crawler.crawl_site(&site(&server, 10)).await;
        assert!(report.aborted);
        assert_eq!(report.discovered, 0);
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_ledger_record() {
        let mut server = Server::new_async().await;
        let _landing = mock_page(&mut server, "/news", landing(&["/articles/1"]), 1).await;
        let _article = mock_page(&mut server, "/news/articles/1", article_page("One"), 1).await;

        let ledger = Arc::new(MemoryLedger::new());
        let failing = RecordingSink {
            fail_articles: true,
            ..Default::default()
        };
        let crawler = crawler(ledger.clone(), Sinks::new().with(failing));
        let report = crawler.crawl_site(&site(&server, 10)).await;

        assert_eq!(report.delivered, 0);
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_aggregate_file_written_per_site() {
        let mut server = Server::new_async().await;
        let _landing =
            mock_page(&mut server, "/news", landing(&["/articles/1", "/articles/1"]), 1).await;
        let _article =
            mock_page(&mut server, "/news/articles/1", article_page("  One  "), 1).await;

        let tmp = tempfile::tempdir().unwrap();
        let sink = AggregateFileSink::new(tmp.path());
        let path = sink.path_for(&site_host(&server.url()));
        let crawler = crawler(Arc::new(MemoryLedger::new()), Sinks::new().with(sink));
        let report = crawler.crawl_site(&site(&server, 10)).await;

        // The repeated link is claimed once and skipped the second time.
        assert_eq!(report.selected, 2);
        assert_eq!(report.skipped, 1);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!([
                {"url": format!("{}/news/articles/1", server.url()), "content": "One"}
            ])
        );
    }
}
