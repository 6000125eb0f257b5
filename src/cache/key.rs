//! Canonical cache keys for API requests.

use std::collections::BTreeMap;
use url::form_urlencoded;
use std::fmt;

/// Cache key derived from an endpoint path and its query parameters.
///
/// Parameters are kept sorted by name and form-encoded, so two requests
/// carrying the same parameters in a different order map to the same key
/// and different parameters never do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
  path: String,
  query: String,
}

impl RequestKey {
  /// Build a key from a path and any collection of `(name, value)` pairs.
  pub fn new<I, K, V>(path: &str, params: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
  {
    let sorted: BTreeMap<String, String> = params
      .into_iter()
      .map(|(k, v)| (k.into(), v.to_string()))
      .collect();

    // Encoded so a value containing `&` or `=` cannot mimic other params
    let query = sorted
      .iter()
      .fold(form_urlencoded::Serializer::new(String::new()), |mut query, (k, v)| {
        query.append_pair(k, v);
        query
      })
      .finish();

    Self {
      path: normalize_path(path),
      query,
    }
  }

  /// Key for a path with no parameters.
  pub fn path(path: &str) -> Self {
    Self::new(path, std::iter::empty::<(String, String)>())
  }

  pub fn path_str(&self) -> &str {
    &self.path
  }

  pub fn query_str(&self) -> &str {
    &self.query
  }

  /// Whether this key's path is `prefix` or nested below it.
  pub fn is_under(&self, prefix: &str) -> bool {
    let prefix = normalize_path(prefix);
    if prefix == "/" {
      return true;
    }
    self.path == prefix
      || self
        .path
        .strip_prefix(&prefix)
        .is_some_and(|rest| rest.starts_with('/'))
  }
}

impl fmt::Display for RequestKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.query.is_empty() {
      write!(f, "{}", self.path)
    } else {
      write!(f, "{}?{}", self.path, self.query)
    }
  }
}

/// Leading slash, no trailing slash, no empty segments.
fn normalize_path(path: &str) -> String {
  let segments: Vec<&str> = path
    .trim()
    .split('/')
    .filter(|s| !s.is_empty())
    .collect();
  format!("/{}", segments.join("/"))
}
