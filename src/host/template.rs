//! URI patterns for resources.
//!
//! A pattern is either a literal URI (`info://server`) or a template with
//! `{placeholder}` segments (`greeting://{name}`). Each placeholder matches
//! one non-empty run of characters other than `/`.

use indexmap::IndexMap;
use regex::Regex;

use super::error::{HandlerResult, HostError, HostResult};

/// Placeholder values extracted from a matched URI, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings(IndexMap<String, String>);

impl Bindings {
    /// Returns the value bound to a placeholder.
    ///
    /// # Errors
    ///
    /// Returns an error if the template has no such placeholder.
    pub fn get(&self, name: &str) -> HandlerResult<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| format!("no placeholder named '{name}'").into())
    }

    /// Iterates over `(placeholder, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of bound placeholders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for literal matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A compiled URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    raw: String,
    regex: Regex,
    placeholders: Vec<String>,
}

impl UriTemplate {
    /// Returns the template as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the placeholder names in order of appearance.
    #[must_use]
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Matches a URI, returning its bindings on success.
    #[must_use]
    pub fn match_uri(&self, uri: &str) -> Option<Bindings> {
        let captures = self.regex.captures(uri)?;
        let bindings = self
            .placeholders
            .iter()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect();
        Some(Bindings(bindings))
    }
}

/// A resource URI pattern.
#[derive(Debug, Clone)]
pub enum UriPattern {
    /// Matches exactly one URI.
    Literal(String),
    /// Matches a family of URIs.
    Template(UriTemplate),
}

impl UriPattern {
    /// Parses a pattern, compiling templates.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Configuration`] for unbalanced braces, empty or
    /// non-identifier placeholder names, and repeated placeholders.
    pub fn parse(raw: &str) -> HostResult<Self> {
        if raw.is_empty() {
            return Err(HostError::configuration("resource URI pattern is empty"));
        }

        let mut regex_src = String::from("^");
        let mut placeholders: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(malformed(raw, "nested '{'")),
                            _ => name.push(c),
                        }
                    }
                    if !closed {
                        return Err(malformed(raw, "unclosed '{'"));
                    }
                    if !is_identifier(&name) {
                        return Err(malformed(
                            raw,
                            &format!("invalid placeholder name '{name}'"),
                        ));
                    }
                    if placeholders.contains(&name) {
                        return Err(malformed(raw, &format!("placeholder '{name}' repeated")));
                    }
                    regex_src.push_str(&regex::escape(&literal));
                    literal.clear();
                    regex_src.push_str(&format!("(?P<{name}>[^/]+)"));
                    placeholders.push(name);
                }
                '}' => return Err(malformed(raw, "unmatched '}'")),
                _ => literal.push(c),
            }
        }

        if placeholders.is_empty() {
            return Ok(Self::Literal(raw.to_string()));
        }

        regex_src.push_str(&regex::escape(&literal));
        regex_src.push('$');

        let regex = Regex::new(&regex_src)
            .map_err(|e| malformed(raw, &format!("failed to compile: {e}")))?;

        Ok(Self::Template(UriTemplate {
            raw: raw.to_string(),
            regex,
            placeholders,
        }))
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(uri) => uri,
            Self::Template(template) => template.as_str(),
        }
    }

    /// Returns `true` for literal patterns.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Number of placeholders; lower is more specific.
    #[must_use]
    pub fn wildcard_count(&self) -> usize {
        match self {
            Self::Literal(_) => 0,
            Self::Template(template) => template.placeholders.len(),
        }
    }

    /// Matches a URI against this pattern.
    #[must_use]
    pub fn match_uri(&self, uri: &str) -> Option<Bindings> {
        match self {
            Self::Literal(literal) => (literal == uri).then(Bindings::default),
            Self::Template(template) => template.match_uri(uri),
        }
    }
}

fn malformed(raw: &str, reason: &str) -> HostError {
    HostError::configuration(format!("malformed URI template '{raw}': {reason}"))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
