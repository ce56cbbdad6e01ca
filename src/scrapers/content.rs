//! Article body extraction.

use crate::document::Document;
use crate::document::path::PathExpression;
use crate::error::ParseError;
use crate::fetch::Fetcher;
use crate::utils::{resolve_url, truncate_for_log};
use itertools::Itertools;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

/// Which parts of an article page hold its text.
#[derive(Debug, Clone)]
pub enum ContentLocator {
    ClassToken(String),
    Path(PathExpression),
    /// `re:<regex>`: literal matches in the raw page source, for content the
    /// markup does not delimit.
    Pattern(Regex),
}

impl ContentLocator {
    pub fn detect(locator: &str) -> Self {
        let trimmed = locator.trim();
        if let Some(pattern) = trimmed.strip_prefix("re:") {
            match Regex::new(pattern) {
                Ok(re) => return ContentLocator::Pattern(re),
                Err(e) => warn!(locator, error = %e, "Invalid content regex; treating as class token"),
            }
        }
        if trimmed.starts_with('/') {
            match PathExpression::parse(trimmed) {
                Ok(expr) => return ContentLocator::Path(expr),
                Err(e) => warn!(locator, error = %e, "Invalid path expression; treating as class token"),
            }
        }
        ContentLocator::ClassToken(trimmed.to_string())
    }
}

/// Matched blocks joined one per line. Blank blocks are dropped, so an
/// empty result always means nothing usable was found.
pub fn extract_blocks(document: &Document, locator: &ContentLocator) -> String {
    let blocks = match locator {
        ContentLocator::ClassToken(token) => document.by_class_token(token),
        ContentLocator::Path(expr) => document.path_values(expr),
        ContentLocator::Pattern(re) => document.by_text_pattern(re),
    };
    debug!(blocks = blocks.len(), "Content blocks matched");
    blocks
        .iter()
        .map(|block| block.trim())
        .filter(|block| !block.is_empty())
        .join("\n")
}

/// Parse a body and extract from it. The document is dropped on return.
pub fn extract_from_body(body: &str, locator: &ContentLocator) -> Result<String, ParseError> {
    let document = Document::parse(body)?;
    Ok(extract_blocks(&document, locator))
}

/// Fetch an article and return its text, or an empty string when the
/// fetch, the parse or the locator fails.
#[instrument(level = "info", skip(fetcher, locator), fields(stage = "article"))]
pub async fn extract_content(
    fetcher: &Fetcher,
    base_url: &str,
    article_url: &str,
    locator: &ContentLocator,
) -> String {
    let url = resolve_url(base_url, article_url);
    let fetched = match fetcher.fetch(&url).await {
        Ok(fetched) => fetched,
        Err(e) => {
            warn!(%url, error = %e, "Article fetch failed");
            return String::new();
        }
    };
    match extract_from_body(&fetched.body, locator) {
        Ok(content) => {
            info!(
                %url,
                chars = content.chars().count(),
                preview = %truncate_for_log(&content, 100),
                "Extracted article"
            );
            content
        }
        Err(e) => {
            warn!(%url, error = %e, "Article parse failed");
            String::new()
        }
    }
}
