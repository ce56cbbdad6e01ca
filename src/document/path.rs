//! Structural path expressions.
//!
//! Site configurations locate links and article bodies with a small subset
//! of XPath. Expressions are compiled once into a `scraper` [`Selector`]:
//!
//! | Path                              | Selector                 |
//! |-----------------------------------|--------------------------|
//! | `//div`                           | `div`                    |
//! | `/html/body`                      | `html:root > body`       |
//! | `//ul//a`                         | `ul a`                   |
//! | `//a[@href]`                      | `a[href]`                |
//! | `//a[@rel='next']`                | `a[rel="next"]`          |
//! | `//*[contains(@class,'story')]`   | `*[class*="story"]`      |
//! | `//a[starts-with(@href,'/news')]` | `a[href^="/news"]`       |
//! | `//li[2]`                         | `li:nth-of-type(2)`      |
//!
//! A trailing `/@attr` or `/text()` does not select elements; it is kept as
//! the expression's [`Target`] and read from each matched element.

use crate::error::PathError;
use scraper::Selector;
use std::fmt;

/// What to read from each element an expression matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Element,
    Text,
    Attribute(String),
}

#[derive(Clone)]
pub struct PathExpression {
    source: String,
    css: String,
    selector: Selector,
    target: Target,
}

impl fmt::Debug for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathExpression")
            .field("source", &self.source)
            .field("css", &self.css)
            .field("target", &self.target)
            .finish()
    }
}

impl PathExpression {
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        let source = expr.trim();
        if !source.starts_with('/') {
            return Err(PathError::NotAbsolute(source.to_string()));
        }
        let (css, target) = Compiler::new(source).compile()?;
        let selector = Selector::parse(&css).map_err(|e| PathError::Selector(e.to_string()))?;
        Ok(Self {
            source: source.to_string(),
            css,
            selector,
            target,
        })
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The same expression with its attribute or text suffix removed.
    pub fn elements(&self) -> Self {
        Self {
            target: Target::Element,
            ..self.clone()
        }
    }
}

/// Quote `value` as a CSS string.
pub(crate) fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

enum Axis {
    Child,
    Descendant,
}

struct Compiler<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Compiler<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn syntax(&self) -> PathError {
        PathError::Syntax {
            expr: self.src.to_string(),
            offset: self.pos,
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), PathError> {
        self.skip_ws();
        if self.eat(token) { Ok(()) } else { Err(self.syntax()) }
    }

    fn ident(&mut self) -> Result<&'a str, PathError> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.syntax());
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn literal(&mut self) -> Result<&'a str, PathError> {
        self.skip_ws();
        let quote = match self.rest().chars().next() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.syntax()),
        };
        self.pos += 1;
        let rest = self.rest();
        let end = rest.find(quote).ok_or_else(|| self.syntax())?;
        self.pos += end + 1;
        Ok(&rest[..end])
    }

    fn compile(mut self) -> Result<(String, Target), PathError> {
        let mut css = String::new();
        let mut steps = 0usize;
        let mut target = Target::Element;

        while !self.at_end() {
            let axis = if self.eat("//") {
                Axis::Descendant
            } else if self.eat("/") {
                Axis::Child
            } else {
                return Err(self.syntax());
            };

            if self.eat("@") {
                target = Target::Attribute(self.ident()?.to_string());
                break;
            }
            if self.eat("text()") {
                target = Target::Text;
                break;
            }

            let test = if self.eat("*") { "*" } else { self.ident()? };
            let mut compound = test.to_string();
            while self.eat("[") {
                compound.push_str(&self.predicates(test)?);
            }

            match axis {
                Axis::Child if steps == 0 => compound.push_str(":root"),
                Axis::Child => css.push_str(" > "),
                Axis::Descendant if steps > 0 => css.push(' '),
                Axis::Descendant => {}
            }
            css.push_str(&compound);
            steps += 1;
        }

        if !self.at_end() || steps == 0 {
            return Err(self.syntax());
        }
        Ok((css, target))
    }

    /// Everything between `[` and `]`, with `and` joining conditions.
    fn predicates(&mut self, test: &str) -> Result<String, PathError> {
        let mut out = String::new();
        loop {
            self.skip_ws();
            out.push_str(&self.condition(test)?);
            self.skip_ws();
            if self.eat("and ") {
                continue;
            }
            self.expect("]")?;
            return Ok(out);
        }
    }

    fn condition(&mut self, test: &str) -> Result<String, PathError> {
        let rest = self.rest();
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits > 0 {
            let n = &rest[..digits];
            self.pos += digits;
            return Ok(if test == "*" {
                format!(":nth-child({n})")
            } else {
                format!(":nth-of-type({n})")
            });
        }

        if self.eat("@") {
            let name = self.ident()?;
            self.skip_ws();
            if self.eat("=") {
                let value = self.literal()?;
                return Ok(format!("[{name}={}]", css_string(value)));
            }
            return Ok(format!("[{name}]"));
        }

        for (function, op) in [("contains", "*="), ("starts-with", "^=")] {
            if self.eat(function) {
                self.expect("(")?;
                self.expect("@")?;
                let name = self.ident()?;
                self.expect(",")?;
                let value = self.literal()?;
                self.expect(")")?;
                // An empty needle matches every element carrying the attribute.
                return Ok(if value.is_empty() {
                    format!("[{name}]")
                } else {
                    format!("[{name}{op}{}]", css_string(value))
                });
            }
        }

        let end = rest.find(']').unwrap_or(rest.len());
        Err(PathError::UnsupportedPredicate(rest[..end].trim().to_string()))
    }
}
