//! URL value object: parse a URL string into scheme/host/path/query parts and
//! reassemble it, optionally merging extra query parameters on the way out.
//!
//! This is deliberately not a general RFC 3986 parser. It covers the two
//! shapes the composition layer traffics in: absolute URLs
//! (`scheme://host/path?query`) and relative ones (`path?query`), keeping the
//! query as an ordered name/value list so links can be cloned with overrides.

pub mod query;

pub use query::Query;

use std::fmt;

/// Scheme and host of an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
}

/// A parsed URL.
///
/// Absolute URLs carry an [`Origin`]; relative URLs keep their path string
/// verbatim. The query is parsed eagerly either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    origin: Option<Origin>,
    path: String,
    query: Query,
}

impl Url {
    /// Parse a URL string. Never fails: anything without a `scheme://` prefix
    /// is treated as a relative URL.
    pub fn parse(raw: &str) -> Self {
        let (before_query, query) = match raw.split_once('?') {
            Some((before, raw_query)) => (before, Query::parse(raw_query)),
            None => (raw, Query::new()),
        };

        match split_scheme(before_query) {
            Some((scheme, rest)) => {
                let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
                Url {
                    origin: Some(Origin {
                        scheme: scheme.to_ascii_lowercase(),
                        host: host.trim_matches('/').to_string(),
                    }),
                    path: path.trim_matches('/').to_string(),
                    query,
                }
            }
            None => Url {
                origin: None,
                path: before_query.to_string(),
                query,
            },
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.origin.is_some()
    }

    pub fn scheme(&self) -> Option<&str> {
        self.origin.as_ref().map(|o| o.scheme.as_str())
    }

    pub fn host(&self) -> Option<&str> {
        self.origin.as_ref().map(|o| o.host.as_str())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Query {
        &mut self.query
    }

    /// Reassemble the URL string. When `merge` is given, its pairs override
    /// the URL's own query (by name) for this rendering only; if the URL has
    /// no query of its own the merge is used as-is.
    pub fn to_url(&self, merge: Option<&Query>) -> String {
        let query_string = self.query_string(merge);
        let mut out = match &self.origin {
            Some(origin) => format!("{}://{}/{}", origin.scheme, origin.host, self.path),
            None => self.path.clone(),
        };
        if !query_string.is_empty() {
            out.push('?');
            out.push_str(&query_string);
        }
        out
    }

    /// Clone this URL with `merge` folded into its query.
    pub fn with_query(&self, merge: &Query) -> Url {
        let mut cloned = self.clone();
        if cloned.query.is_empty() {
            cloned.query = merge.clone();
        } else {
            cloned.query.merge(merge);
        }
        cloned
    }

    /// Upgrade a relative URL to an absolute one. Any leading slashes on the
    /// stored path are stripped so reassembly emits exactly one separator.
    pub fn set_origin(&mut self, scheme: impl Into<String>, host: impl Into<String>) {
        self.origin = Some(Origin {
            scheme: scheme.into(),
            host: host.into(),
        });
        self.path = self.path.trim_start_matches('/').to_string();
    }

    fn query_string(&self, merge: Option<&Query>) -> String {
        match merge {
            Some(merge) if self.query.is_empty() => merge.encode(),
            Some(merge) => {
                let mut merged = self.query.clone();
                merged.merge(merge);
                merged.encode()
            }
            None => self.query.encode(),
        }
    }
}

/// Split `scheme://rest` if the prefix looks like a scheme (one or more
/// ASCII alphanumerics before `://`).
fn split_scheme(s: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = s.split_once("://")?;
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some((scheme, rest))
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url(None))
    }
}

impl From<&str> for Url {
    fn from(raw: &str) -> Self {
        Url::parse(raw)
    }
}
