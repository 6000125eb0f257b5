//! Client-visible store state.

use serde::Serialize;

use super::filters::Filters;
use super::resource::Resource;
use crate::api::PaginationState;

/// Lifecycle of a store's data.
///
/// `Idle` only before the first action; `Ready` and `Error` are both resting
/// states from which a new action moves back to `Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
  #[default]
  Idle,
  Loading,
  Ready,
  Error,
}

impl LoadState {
  pub fn is_loading(&self) -> bool {
    matches!(self, LoadState::Loading)
  }

  pub fn is_ready(&self) -> bool {
    matches!(self, LoadState::Ready)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, LoadState::Error)
  }
}

/// Everything a store owns for one resource collection.
#[derive(Debug, Clone, Serialize)]
pub struct StoreState<R: Resource> {
  pub items: Vec<R>,
  pub current: Option<R>,
  pub load: LoadState,
  pub error: Option<String>,
  pub pagination: PaginationState,
  pub filters: Filters,
  /// Operations started and not yet settled
  #[serde(skip)]
  active: u32,
  /// Whether a settled operation changed state while others were pending
  #[serde(skip)]
  applied: bool,
  /// Load state and error before the current burst of operations
  #[serde(skip)]
  resting: (LoadState, Option<String>),
  /// Bumped by `reset`; operations begun earlier settle as no-ops
  #[serde(skip)]
  epoch: u64,
}

/// How an operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Settle {
  /// State was updated
  Applied,
  Failed(String),
  /// Cancelled, superseded or dropped; nothing was applied
  Discarded,
}

impl<R: Resource> Default for StoreState<R> {
  fn default() -> Self {
    Self {
      items: Vec::new(),
      current: None,
      load: LoadState::Idle,
      error: None,
      pagination: PaginationState::default(),
      filters: Filters::default(),
      active: 0,
      applied: false,
      resting: (LoadState::Idle, None),
      epoch: 0,
    }
  }
}

impl<R: Resource> StoreState<R> {
  pub fn is_loading(&self) -> bool {
    self.load.is_loading()
  }

  /// An operation starts: clears the previous error. Returns the epoch the
  /// operation must settle against.
  pub(super) fn begin(&mut self) -> u64 {
    if self.active == 0 {
      self.resting = (self.load, self.error.take());
      self.applied = false;
    }
    self.active += 1;
    self.load = LoadState::Loading;
    self.error = None;
    self.epoch
  }

  /// An operation ends. Existing items are never cleared on failure, and
  /// when nothing was applied the previous resting state comes back.
  pub(super) fn settle(&mut self, epoch: u64, outcome: Settle) {
    if epoch != self.epoch {
      return;
    }
    self.active = self.active.saturating_sub(1);
    match outcome {
      Settle::Applied => self.applied = true,
      Settle::Failed(message) => self.error = Some(message),
      Settle::Discarded => {}
    }
    if self.active > 0 {
      return;
    }
    if self.error.is_some() {
      self.load = LoadState::Error;
    } else if self.applied {
      self.load = LoadState::Ready;
    } else {
      let (load, error) = std::mem::replace(&mut self.resting, (LoadState::Idle, None));
      self.load = load;
      self.error = error;
    }
  }

  /// Back to the initial state; operations still pending no longer count.
  pub(super) fn reset(&mut self) {
    let epoch = self.epoch.wrapping_add(1);
    *self = Self::default();
    self.epoch = epoch;
  }

  /// Apply `f` to the list item and current item with the given id.
  pub(super) fn patch(&mut self, id: &str, mut f: impl FnMut(&mut R)) -> bool {
    let mut found = false;
    for item in self.items.iter_mut().filter(|i| i.id() == id) {
      f(item);
      found = true;
    }
    if let Some(current) = self.current.as_mut().filter(|c| c.id() == id) {
      f(current);
      found = true;
    }
    found
  }

  /// Replace the item with the same id, or append it.
  pub(super) fn upsert(&mut self, item: R) {
    match self.items.iter_mut().find(|i| i.id() == item.id()) {
      Some(existing) => *existing = item,
      None => self.items.push(item),
    }
  }

  /// Replace the item with the same id, leaving the list alone otherwise.
  pub(super) fn replace(&mut self, item: &R) {
    if let Some(existing) = self.items.iter_mut().find(|i| i.id() == item.id()) {
      *existing = item.clone();
    }
    if let Some(current) = self.current.as_mut().filter(|c| c.id() == item.id()) {
      *current = item.clone();
    }
  }

  pub(super) fn remove(&mut self, id: &str) {
    self.items.retain(|i| i.id() != id);
    if self.current.as_ref().is_some_and(|c| c.id() == id) {
      self.current = None;
    }
  }
}
