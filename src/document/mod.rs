//! Parsed HTML pages and the queries the extractors run against them.
//!
//! A [`Document`] is an immutable view of one response body. It is created
//! and dropped within a single synchronous extraction call and never held
//! across an `.await`.

pub mod path;

use crate::error::ParseError;
use once_cell::sync::Lazy;
use path::{PathExpression, Target, css_string};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// One element matched by a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

impl Node {
    fn from_element(element: ElementRef<'_>) -> Self {
        let value = element.value();
        Self {
            name: value.name().to_string(),
            attributes: value
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: element_text(element),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Concatenated text of an element and all its descendants.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

pub struct Document {
    source: String,
    html: Html,
}

impl Document {
    /// Parse a decoded response body. The parser recovers from malformed
    /// markup; only a body with no content at all is rejected.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        if source.trim().is_empty() {
            return Err(ParseError::Empty);
        }
        let html = Html::parse_document(source);
        let source = source.to_string();
        if !html.errors.is_empty() {
            debug!(errors = html.errors.len(), "Recovered from malformed HTML");
        }
        Ok(Self { source, html })
    }

    /// Text of every element whose `class` attribute contains `token`, in
    /// document order.
    pub fn by_class_token(&self, token: &str) -> Vec<String> {
        if token.is_empty() {
            return Vec::new();
        }
        let css = format!("*[class*={}]", css_string(token));
        match Selector::parse(&css) {
            Ok(selector) => self.html.select(&selector).map(element_text).collect(),
            Err(e) => {
                warn!(%token, error = %e, "Class token does not form a valid selector");
                Vec::new()
            }
        }
    }

    /// Every element matched by `expr`, in document order.
    ///
    /// When the expression ends in `/@attr`, elements lacking that attribute
    /// are left out.
    pub fn by_path(&self, expr: &PathExpression) -> Vec<Node> {
        self.html
            .select(expr.selector())
            .filter(|el| match expr.target() {
                Target::Attribute(name) => el.value().attr(name).is_some(),
                _ => true,
            })
            .map(Node::from_element)
            .collect()
    }

    /// The values `expr` designates: the attribute it ends in, or element
    /// text otherwise.
    pub fn path_values(&self, expr: &PathExpression) -> Vec<String> {
        self.by_path(expr)
            .into_iter()
            .filter_map(|node| match expr.target() {
                Target::Attribute(name) => node.attr(name).map(str::to_string),
                Target::Text | Target::Element => Some(node.text),
            })
            .collect()
    }

    /// Literal substrings of the raw page source matching `pattern`.
    pub fn by_text_pattern(&self, pattern: &Regex) -> Vec<String> {
        pattern
            .find_iter(&self.source)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// `href` of every anchor on the page, in document order.
    pub fn anchor_targets(&self) -> Vec<String> {
        self.html
            .select(&ANCHOR_SELECTOR)
            .filter_map(|el| el.value().attr("href"))
            .map(str::to_string)
            .collect()
    }
}
