//! Article discovery and body extraction.
//!
//! Every site goes through the same two phases, driven by its configuration
//! instead of per-outlet code:
//!
//! 1. **Link discovery** ([`links`]): run the site's link pattern over the
//!    landing page and collect candidate article URLs in document order
//! 2. **Content extraction** ([`content`]): fetch each article and pull the
//!    text out of the blocks named by the content locator
//!
//! # Pattern forms
//!
//! | Setting           | Path form                                  | Anything else                |
//! |-------------------|--------------------------------------------|------------------------------|
//! | `link_pattern`    | `//...`, `/...[@...]`, or an element name  | regex over every anchor href |
//! | `content_locator` | starts with `/`                            | class token                  |
//!
//! A bare `a` in `link_pattern` means every anchor (`//a`); another element
//! name means the anchors inside it. `link_filter` narrows the hrefs in
//! either form. A `link_pattern` like `/articles/` is an href rule, not a
//! path.
//!
//! A `content_locator` of the form `re:<regex>` matches the raw page source
//! instead of the parsed tree.
//!
//! Failures at this layer never propagate: a broken page yields no links or
//! empty content, and the crawler decides what that means.

pub mod content;
pub mod links;

use regex::Regex;
use tracing::warn;

/// A textual matching rule: a regular expression, or a plain substring
/// when the rule is not a valid regex.
#[derive(Debug, Clone)]
pub enum TextRule {
    Regex(Regex),
    Literal(String),
}

impl TextRule {
    pub fn new(rule: &str) -> Self {
        match Regex::new(rule) {
            Ok(re) => TextRule::Regex(re),
            Err(e) => {
                warn!(%rule, error = %e, "Rule is not a regex; matching literally");
                TextRule::Literal(rule.to_string())
            }
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            TextRule::Regex(re) => re.is_match(value),
            TextRule::Literal(needle) => value.contains(needle.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_rule() {
        let rule = TextRule::new(r"/articles/\d+");
        assert!(matches!(rule, TextRule::Regex(_)));
        assert!(rule.matches("/articles/42"));
        assert!(!rule.matches("/articles/latest"));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_literal() {
        let rule = TextRule::new("/news/(");
        assert!(matches!(rule, TextRule::Literal(_)));
        assert!(rule.matches("https://x.test/news/(draft)"));
        assert!(!rule.matches("https://x.test/news/"));
    }
}
