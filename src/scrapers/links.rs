//! Link discovery on a landing page.

use super::TextRule;
use crate::document::Document;
use crate::document::path::PathExpression;
use tracing::{debug, info, warn};

/// Bare element names accepted as a link pattern. `a` selects every anchor;
/// any other name selects the anchors inside that element.
const ELEMENT_NAMES: &[&str] = &[
    "a", "article", "aside", "div", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "li", "main", "nav", "ol", "section", "span", "table", "td", "ul",
];

/// How a site's article links are selected. The optional filter narrows
/// the candidate `href`s in either form.
#[derive(Debug, Clone)]
pub enum LinkRule {
    /// Anchors located by a path expression.
    Structural {
        expr: PathExpression,
        filter: Option<TextRule>,
    },
    /// Every anchor on the page whose `href` matches the rule.
    Textual {
        rule: TextRule,
        filter: Option<TextRule>,
    },
}

/// Whether `pattern` is written as a path rather than as an href rule.
/// `/articles/` is an href fragment; `//a` and `/html/body/a[@href]` are
/// paths.
fn has_path_shape(pattern: &str) -> bool {
    pattern.starts_with("//")
        || (pattern.starts_with('/')
            && (pattern.contains("//")
                || pattern.contains("[@")
                || pattern.contains("(@")
                || pattern.contains("/@")
                || pattern.ends_with("/text()")))
}

impl LinkRule {
    pub fn detect(pattern: &str, filter: Option<&str>) -> Self {
        let filter = filter.map(TextRule::new);
        let pattern = pattern.trim();

        let lowered = pattern.to_ascii_lowercase();
        let path = if lowered == "a" {
            Some("//a".to_string())
        } else if ELEMENT_NAMES.contains(&lowered.as_str()) {
            Some(format!("//{lowered}//a"))
        } else if has_path_shape(pattern) {
            Some(pattern.to_string())
        } else {
            None
        };

        if let Some(path) = path {
            match PathExpression::parse(&path) {
                Ok(expr) => {
                    // The located elements matter; the link is always read
                    // from the anchor's own href.
                    let expr = expr.elements();
                    debug!(pattern, css = expr.css(), "Structural link pattern");
                    return LinkRule::Structural { expr, filter };
                }
                Err(e) => {
                    warn!(pattern, error = %e, "Unsupported path expression; using it as an href rule");
                }
            }
        }
        LinkRule::Textual {
            rule: TextRule::new(pattern),
            filter,
        }
    }
}

/// Candidate hrefs for a path expression, read from the anchors it locates.
fn structural_hrefs(document: &Document, expr: &PathExpression) -> Vec<String> {
    let nodes = document.by_path(expr);
    debug!(nodes = nodes.len(), "Nodes matching link pattern");
    nodes
        .into_iter()
        .filter_map(|node| {
            if node.name != "a" {
                debug!(element = %node.name, "Skipping non-anchor element");
                return None;
            }
            let href = node.attr("href").map(str::to_string);
            if href.is_none() {
                warn!("Anchor without href");
            }
            href
        })
        .collect()
}

/// Candidate article URLs in document order. Repeats within the page are
/// kept; deduplication happens against the ledger.
pub fn extract_links(document: &Document, rule: &LinkRule) -> Vec<String> {
    let (candidates, filter) = match rule {
        LinkRule::Structural { expr, filter } => (structural_hrefs(document, expr), filter),
        LinkRule::Textual { rule, filter } => (
            document
                .anchor_targets()
                .into_iter()
                .filter(|href| rule.matches(href))
                .collect(),
            filter,
        ),
    };
    let found = candidates.len();
    let links: Vec<String> = candidates
        .into_iter()
        .filter(|href| filter.as_ref().is_none_or(|f| f.matches(href)))
        .collect();
    info!(count = links.len(), filtered = found - links.len(), "Article links found");
    links
}
