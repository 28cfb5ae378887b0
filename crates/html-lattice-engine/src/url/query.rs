use std::borrow::Cow;
use std::fmt;

/// An ordered query string: name/value pairs that keep their first-seen
/// position while behaving like a map on writes.
///
/// Setting a name that is already present replaces the value in place;
/// setting a new name appends. This mirrors how a query string is usually
/// read back ("the" value for a name) without losing the order the pairs
/// were written in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the part after `?`. Pairs are split on `&`, names and values on
    /// the first `=`. Values are percent-decoded; names are taken verbatim.
    /// Pairs with an empty name are skipped.
    pub fn parse(raw: &str) -> Self {
        let mut query = Query::new();
        for piece in raw.split('&') {
            let (name, value) = piece.split_once('=').unwrap_or((piece, ""));
            if name.is_empty() {
                continue;
            }
            let value = match urlencoding::decode(value) {
                Ok(decoded) => decoded.into_owned(),
                // Undecodable escapes (invalid UTF-8) are kept verbatim.
                Err(_) => value.to_string(),
            };
            query.set(name, value);
        }
        query
    }

    /// Replace the value for `name` in place, or append a new pair.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.pairs.iter().position(|(n, _)| n == name)?;
        Some(self.pairs.remove(idx).1)
    }

    /// Fold `other` into `self`: existing names are overwritten in place,
    /// new names are appended in `other`'s order.
    pub fn merge(&mut self, other: &Query) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Serialize as `name=value&...` with percent-encoded values.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (name, value) in self.iter() {
            if !out.is_empty() {
                out.push('&');
            }
            out.push_str(name);
            out.push('=');
            out.push_str(&encode_value(value));
        }
        out
    }
}

fn encode_value(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Query {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut query = Query::new();
        for (name, value) in iter {
            query.set(name, value);
        }
        query
    }
}
