//! Query construction for Musixmatch API requests.
//!
//! Every outbound request is a GET against
//! `<base>/<method>?<query>` where the query carries the API credential
//! plus method-specific parameters. Parameters keep their insertion
//! order when serialized.

use std::fmt;

use crate::error::{MusixmatchError, Result};

/// Name of the credential query parameter.
pub const APIKEY_PARAM: &str = "apikey";

/// A query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// String value, sent as-is.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Boolean value, rendered as `true`/`false`.
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => write!(f, "{}", s),
            ParamValue::Int(n) => write!(f, "{}", n),
            ParamValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Int(n)
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        ParamValue::Int(n as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

/// Ordered collection of query parameters.
///
/// `set` replaces an existing parameter in place, so the serialized
/// order is the order of first insertion.
#[derive(Debug, Clone, Default)]
pub struct ApiQuery {
    pairs: Vec<(String, ParamValue)>,
}

impl ApiQuery {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any existing value under the same name.
    pub fn set<V: Into<ParamValue>>(&mut self, name: &str, value: V) {
        let value = value.into();
        if let Some(pair) = self.pairs.iter_mut().find(|(n, _)| n == name) {
            pair.1 = value;
        } else {
            self.pairs.push((name.to_string(), value));
        }
    }

    /// Serialize as `key=value` pairs joined by `&`, in insertion order.
    ///
    /// Values are not percent-encoded here; reqwest's URL parser escapes
    /// reserved characters when the request is sent.
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Build the fully qualified URL for an API method call.
///
/// The credential is always injected under [`APIKEY_PARAM`], overwriting
/// any caller-supplied value for that key.
pub fn build_api_url(base_url: &str, method: &str, query: &ApiQuery, apikey: &str) -> String {
    let mut query = query.clone();
    query.set(APIKEY_PARAM, apikey);
    format!(
        "{}/{}?{}",
        base_url.trim_end_matches('/'),
        method,
        query.encode()
    )
}

/// Optional search filters, validated for presence before a search call.
///
/// Callers forwarding optional settings may insert `None`; the search
/// path rejects such filters with a validation error before any network
/// call is made.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pairs: Vec<(String, Option<ParamValue>)>,
}

impl SearchFilters {
    /// Create an empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a filter, replacing any existing value under the same name.
    pub fn insert(&mut self, name: &str, value: Option<ParamValue>) {
        if let Some(pair) = self.pairs.iter_mut().find(|(n, _)| n == name) {
            pair.1 = value;
        } else {
            self.pairs.push((name.to_string(), value));
        }
    }

    /// Check that no filter value is unset.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.pairs {
            if value.is_none() {
                return Err(MusixmatchError::Validation(name.clone()));
            }
        }
        Ok(())
    }

    /// Validate and return the concrete `(name, value)` pairs in order.
    pub fn validated(&self) -> Result<Vec<(&str, &ParamValue)>> {
        self.validate()?;
        Ok(self
            .pairs
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.as_str(), v)))
            .collect())
    }
}
