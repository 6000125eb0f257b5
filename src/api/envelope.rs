//! Normalization of the backend response envelope.
//!
//! The backend wraps most responses as
//! `{ status, message, data, pagination? }` but is loose about it: `data`
//! may be absent, a list, a single object, or an object wrapping the list
//! under a resource-specific key, and some endpoints return a bare array.
//! [`Envelope::parse`] matches on the shape once so the rest of the crate
//! only sees fully-populated values.

use serde::Serialize;
use serde_json::{Map, Value};

use super::api_types::{reserialize, ApiPagination};

/// Payload carried by a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
  Empty,
  One(Value),
  Many(Vec<Value>),
}

impl Payload {
  fn from_value(value: Value, list_keys: &[&str]) -> (Self, Option<Value>) {
    match value {
      Value::Null => (Payload::Empty, None),
      Value::Array(items) => (Payload::Many(items), None),
      Value::Object(mut map) => match take_list(&mut map, list_keys) {
        Some(items) => (Payload::Many(items), map.remove("pagination")),
        None => (Payload::One(Value::Object(map)), None),
      },
      other => (Payload::One(other), None),
    }
  }

  pub fn len(&self) -> usize {
    match self {
      Payload::Empty => 0,
      Payload::One(_) => 1,
      Payload::Many(items) => items.len(),
    }
  }

  /// Items as a list; a single object becomes a one-element list.
  pub fn into_items(self) -> Vec<Value> {
    match self {
      Payload::Empty => Vec::new(),
      Payload::One(item) => vec![item],
      Payload::Many(items) => items,
    }
  }

  /// The single object; for a list, its first element.
  pub fn into_single(self) -> Option<Value> {
    match self {
      Payload::Empty => None,
      Payload::One(item) => Some(item),
      Payload::Many(items) => items.into_iter().next(),
    }
  }
}

/// The first array found under one of `list_keys`.
fn take_list(map: &mut Map<String, Value>, list_keys: &[&str]) -> Option<Vec<Value>> {
  let key = list_keys
    .iter()
    .copied()
    .chain(["items", "results"])
    .find(|k| map.get(*k).is_some_and(Value::is_array))?;
  match map.remove(key) {
    Some(Value::Array(items)) => Some(items),
    _ => None,
  }
}

/// Client-visible pagination, always fully populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationState {
  pub current_page: u32,
  pub total_pages: u32,
  pub total_items: u32,
  pub items_per_page: u32,
  pub has_next: bool,
  pub has_prev: bool,
}

impl Default for PaginationState {
  fn default() -> Self {
    Self::single_page(0)
  }
}

impl PaginationState {
  /// Used when the backend sends no pagination block.
  pub fn single_page(item_count: u32) -> Self {
    Self {
      current_page: 1,
      total_pages: 1,
      total_items: item_count,
      items_per_page: item_count,
      has_next: false,
      has_prev: false,
    }
  }

  /// Reported flags are trusted as-is; only missing ones are derived.
  fn from_api(raw: ApiPagination, item_count: u32) -> Self {
    let current_page = raw.current_page.unwrap_or(1).max(1);
    let total_pages = raw.total_pages.unwrap_or(1).max(1);
    Self {
      current_page,
      total_pages,
      total_items: raw.total_items.unwrap_or(item_count),
      items_per_page: raw.items_per_page.unwrap_or(item_count),
      has_next: raw.has_next.unwrap_or(current_page < total_pages),
      has_prev: raw.has_prev.unwrap_or(current_page > 1),
    }
  }
}

/// A parsed response.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
  /// `"success"` or `"error"` when the backend reports it
  pub status: Option<String>,
  pub message: Option<String>,
  pub payload: Payload,
  pub pagination: PaginationState,
}

impl Envelope {
  /// Parse any response body. Never fails.
  ///
  /// `list_keys` names the keys under which a resource list may be nested
  /// inside `data` (e.g. `["halakat", "episodes"]`).
  pub fn parse(root: Value, list_keys: &[&str]) -> Self {
    let (status, message, payload, raw_pagination) = match root {
      Value::Object(mut map) if map.contains_key("data") || map.contains_key("status") => {
        let status = map
          .remove("status")
          .and_then(|v| v.as_str().map(String::from));
        let message = map
          .remove("message")
          .and_then(|v| v.as_str().map(String::from));
        let pagination = map.remove("pagination");
        let (payload, nested_pagination) =
          Payload::from_value(map.remove("data").unwrap_or(Value::Null), list_keys);
        (status, message, payload, pagination.or(nested_pagination))
      }
      other => {
        let (payload, nested_pagination) = Payload::from_value(other, list_keys);
        (None, None, payload, nested_pagination)
      }
    };

    let item_count = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    let pagination = match raw_pagination {
      Some(value @ Value::Object(_)) => reserialize::<ApiPagination>(value)
        .map(|raw| PaginationState::from_api(raw, item_count))
        .unwrap_or_else(|_| PaginationState::single_page(item_count)),
      _ => PaginationState::single_page(item_count),
    };

    Envelope {
      status,
      message,
      payload,
      pagination,
    }
  }

  /// The backend explicitly reported a failure.
  pub fn is_error(&self) -> bool {
    self
      .status
      .as_deref()
      .is_some_and(|s| s.eq_ignore_ascii_case("error") || s.eq_ignore_ascii_case("fail"))
  }
}
