//! Redirect URL building
//!
//! `transactionToken` and `contextId` are conventional query parameters.
//! A URL built here carries each at most once, and neither is ever copied
//! from one request into the next redirect.

use formgate_core::limits::is_reserved;
use std::fmt;
use url::form_urlencoded;

/// Path plus ordered query parameters
///
/// Parameters are held decoded; reserved names are recognised however the
/// original URL encoded them. [`Display`](fmt::Display) re-encodes the query
/// as `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectUrl {
    path: String,
    params: Vec<(String, String)>,
}

impl RedirectUrl {
    /// Parse `url` into path and decoded query; a fragment is dropped
    pub fn parse(url: &str) -> Self {
        let url = url.split('#').next().unwrap_or_default();
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let params = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self {
            path: path.to_string(),
            params,
        }
    }

    /// The path without query
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded value of the first parameter called `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of parameters called `name`
    pub fn count(&self, name: &str) -> usize {
        self.params.iter().filter(|(k, _)| k == name).count()
    }

    /// Replace every parameter called `name` with one carrying `value`
    pub fn set(mut self, name: &str, value: &str) -> Self {
        self.params.retain(|(k, _)| k != name);
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// Drop every parameter called `name`
    pub fn remove(mut self, name: &str) -> Self {
        self.params.retain(|(k, _)| k != name);
        self
    }

    /// Drop `transactionToken` and `contextId`
    pub fn strip_reserved(mut self) -> Self {
        self.params.retain(|(k, _)| !is_reserved(k));
        self
    }
}

impl fmt::Display for RedirectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.params.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.params)
                .finish();
            write!(f, "?{}", query)?;
        }
        Ok(())
    }
}

/// Set `name=value` on `url`, replacing any existing occurrences
pub fn append_param(url: &str, name: &str, value: &str) -> String {
    RedirectUrl::parse(url).set(name, value).to_string()
}

/// Copy `params`, leaving out reserved names
pub fn strip_reserved<I, K, V>(params: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    params
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .filter(|(k, _)| !is_reserved(k))
        .collect()
}
