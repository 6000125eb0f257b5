//! List filters and list queries.

use serde::Serialize;
use std::collections::BTreeMap;

pub const PAGE_KEY: &str = "page";
pub const LIMIT_KEY: &str = "limit";

/// Filter value that means "no filter".
pub fn is_wildcard(value: &str) -> bool {
  let value = value.trim();
  value.is_empty() || value.eq_ignore_ascii_case("all")
}

/// Filter state of a store.
///
/// Changing any filter other than the page sends the page back to 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filters {
  values: BTreeMap<String, String>,
  page: u32,
}

impl Default for Filters {
  fn default() -> Self {
    Self {
      values: BTreeMap::new(),
      page: 1,
    }
  }
}

impl Filters {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder form of [`set`](Self::set).
  pub fn with(mut self, key: &str, value: impl ToString) -> Self {
    self.set(key, value);
    self
  }

  /// Merge one filter. Returns true when a non-page filter changed.
  ///
  /// An empty value removes the filter. An unparsable page becomes 1.
  pub fn set(&mut self, key: &str, value: impl ToString) -> bool {
    let value = value.to_string();
    if key == PAGE_KEY {
      self.page = value.trim().parse().ok().filter(|p| *p > 0).unwrap_or(1);
      return false;
    }

    let changed = if value.trim().is_empty() {
      self.values.remove(key).is_some()
    } else {
      self.values.insert(key.to_string(), value.clone()).as_deref() != Some(value.as_str())
    };
    self.page = 1;
    changed
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    if key == PAGE_KEY {
      return None;
    }
    self.values.get(key).map(String::as_str)
  }

  pub fn page(&self) -> u32 {
    self.page
  }

  pub fn values(&self) -> &BTreeMap<String, String> {
    &self.values
  }

  /// Filters that actually restrict results.
  pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .values
      .iter()
      .filter(|(_, v)| !is_wildcard(v))
      .map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn clear(&mut self) {
    self.values.clear();
    self.page = 1;
  }
}

/// Arguments of a list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
  pub filters: BTreeMap<String, String>,
  pub page: u32,
  pub limit: u32,
  /// Append to the current list instead of replacing it ("load more")
  pub append: bool,
}

impl ListQuery {
  pub fn new<I, K, V>(filters: I, page: u32, limit: u32, append: bool) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
  {
    Self {
      filters: filters
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_string()))
        .collect(),
      page: page.max(1),
      limit: limit.max(1),
      append,
    }
  }

  /// Query for the page currently selected in `filters`.
  pub fn from_filters(filters: &Filters, limit: u32) -> Self {
    Self::new(filters.active(), filters.page(), limit, false)
  }

  /// Parameters sent to the backend. Wildcard filters are left out.
  pub fn params(&self) -> Vec<(String, String)> {
    self
      .filters
      .iter()
      .filter(|(k, v)| !is_wildcard(v) && k.as_str() != PAGE_KEY && k.as_str() != LIMIT_KEY)
      .map(|(k, v)| (k.clone(), v.clone()))
      .chain([
        (PAGE_KEY.to_string(), self.page.to_string()),
        (LIMIT_KEY.to_string(), self.limit.to_string()),
      ])
      .collect()
  }
}
