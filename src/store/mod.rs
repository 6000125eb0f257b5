//! Resource stores: the single owner of each resource collection's
//! client-visible state.
//!
//! A [`ResourceStore`] sits between callers and the backend:
//! - reads go through the shared [`RequestCache`] (cache-first, 5 minute TTL)
//! - writes invalidate every cached query of the store's collection
//! - at most one list fetch (and one item fetch) is in flight at a time;
//!   a concurrent call is dropped, not queued
//! - results of a fetch that was superseded or cancelled are discarded
//! - failures record a message but never clear the data already loaded

mod filters;
mod halakat;
mod invitations;
mod refresh;
mod resource;
mod state;
mod students;

use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::api::api_types::reserialize;
use crate::api::{ApiError, Envelope, HttpClient, PaginationState};
use crate::cache::{CacheLayer, CacheSource, RequestCache, RequestKey};

pub use filters::{Filters, ListQuery};
pub use refresh::{RefreshEvent, Refresher};
pub use resource::{HalakaStats, InvitationStats, Resource, StudentStats, TeacherStats};
pub use state::{LoadState, StoreState};
use state::Settle;

/// What a fetch call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
  /// State was updated from the given source
  Applied(CacheSource),
  /// Another fetch of the same kind was already in flight
  Skipped,
  /// A newer fetch or a cancellation made this result obsolete
  Superseded,
}

/// Marks a fetch kind as in flight until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
  fn acquire(flag: &'a AtomicBool) -> Option<Self> {
    flag
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| InFlight(flag))
  }
}

impl Drop for InFlight<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

/// An operation counted in the store's load state.
///
/// Settles exactly once, including when the operation's future is dropped.
struct Pending<'a, R: Resource> {
  state: &'a Mutex<StoreState<R>>,
  epoch: u64,
  settled: bool,
}

impl<R: Resource> Pending<'_, R> {
  fn complete<T>(mut self, apply: impl FnOnce(&mut StoreState<R>) -> T) -> T {
    let mut state = lock(self.state);
    let out = apply(&mut state);
    state.settle(self.epoch, Settle::Applied);
    self.settled = true;
    out
  }

  fn fail(mut self, err: &ApiError) {
    lock(self.state).settle(self.epoch, Settle::Failed(err.message().to_string()));
    self.settled = true;
  }
}

impl<R: Resource> Drop for Pending<'_, R> {
  fn drop(&mut self) {
    if !self.settled {
      lock(self.state).settle(self.epoch, Settle::Discarded);
    }
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Normalize raw items, skipping anything that is not an object.
fn normalize_items<R: Resource>(values: Vec<Value>) -> Vec<R> {
  values
    .into_iter()
    .filter_map(|value| normalize_one::<R>(value))
    .collect()
}

fn normalize_one<R: Resource>(value: Value) -> Option<R> {
  match reserialize::<R::Raw>(value) {
    Ok(raw) => Some(R::normalize(raw)),
    Err(e) => {
      tracing::warn!(resource = R::NAME, error = %e, "skipping malformed item");
      None
    }
  }
}

/// Generic store for one resource collection.
pub struct ResourceStore<R: Resource> {
  client: HttpClient,
  cache: CacheLayer,
  state: Mutex<StoreState<R>>,
  list_in_flight: AtomicBool,
  item_in_flight: AtomicBool,
  list_seq: AtomicU64,
  item_seq: AtomicU64,
  cancel: Mutex<CancellationToken>,
}

impl<R: Resource> ResourceStore<R> {
  pub fn new(client: HttpClient, cache: Arc<RequestCache>) -> Self {
    Self {
      client,
      cache: CacheLayer::new(cache),
      state: Mutex::new(StoreState::default()),
      list_in_flight: AtomicBool::new(false),
      item_in_flight: AtomicBool::new(false),
      list_seq: AtomicU64::new(0),
      item_seq: AtomicU64::new(0),
      cancel: Mutex::new(CancellationToken::new()),
    }
  }

  // ==========================================================================
  // Read-only views
  // ==========================================================================

  pub fn snapshot(&self) -> StoreState<R> {
    lock(&self.state).clone()
  }

  pub fn items(&self) -> Vec<R> {
    lock(&self.state).items.clone()
  }

  pub fn current(&self) -> Option<R> {
    lock(&self.state).current.clone()
  }

  pub fn error(&self) -> Option<String> {
    lock(&self.state).error.clone()
  }

  pub fn load_state(&self) -> LoadState {
    lock(&self.state).load
  }

  pub fn is_loading(&self) -> bool {
    lock(&self.state).is_loading()
  }

  /// Whether a list fetch is in flight.
  pub fn is_request_in_progress(&self) -> bool {
    self.list_in_flight.load(Ordering::Acquire)
  }

  pub fn pagination(&self) -> PaginationState {
    lock(&self.state).pagination
  }

  pub fn filters(&self) -> Filters {
    lock(&self.state).filters.clone()
  }

  /// Items matching every active filter.
  pub fn get_filtered_list(&self) -> Vec<R> {
    let state = lock(&self.state);
    state
      .items
      .iter()
      .filter(|item| {
        state
          .filters
          .active()
          .all(|(key, value)| item.matches_filter(key, value))
      })
      .cloned()
      .collect()
  }

  pub fn get_stats(&self) -> R::Stats {
    R::stats(&lock(&self.state).items)
  }

  /// Cache key of a list query.
  pub fn list_key(query: &ListQuery) -> RequestKey {
    RequestKey::new(R::PATH, query.params())
  }

  // ==========================================================================
  // Fetching
  // ==========================================================================

  fn begin(&self) -> Pending<'_, R> {
    let epoch = lock(&self.state).begin();
    Pending {
      state: &self.state,
      epoch,
      settled: false,
    }
  }

  fn cancel_token(&self) -> CancellationToken {
    lock(&self.cancel).clone()
  }

  /// Fetch one page of the collection.
  ///
  /// Non-append queries are served from the cache when possible and cached
  /// on a miss. Append queries ("load more") always hit the network and are
  /// never cached, since a later page alone is only a partial view.
  pub async fn fetch_list(&self, query: ListQuery) -> Result<FetchOutcome, ApiError> {
    let Some(_in_flight) = InFlight::acquire(&self.list_in_flight) else {
      tracing::debug!(resource = R::NAME, "list fetch already in progress, dropping");
      return Ok(FetchOutcome::Skipped);
    };

    let seq = self.list_seq.fetch_add(1, Ordering::SeqCst) + 1;
    let token = self.cancel_token();
    let key = Self::list_key(&query);
    let pending = self.begin();

    let params = query.params();
    let fetcher = || self.client.get(R::PATH, params);
    let fetched = tokio::select! {
      _ = token.cancelled() => {
        tracing::debug!(resource = R::NAME, %key, "list fetch cancelled");
        return Ok(FetchOutcome::Superseded);
      }
      fetched = async {
        if query.append {
          self.cache.fetch_uncached(fetcher).await
        } else {
          self.cache.fetch(&key, fetcher).await
        }
      } => fetched,
    };

    if self.list_seq.load(Ordering::SeqCst) != seq {
      tracing::debug!(resource = R::NAME, %key, "discarding superseded list result");
      return Ok(FetchOutcome::Superseded);
    }

    match fetched {
      Ok(result) => {
        let source = result.source;
        if let Some(cached_at) = result.cached_at {
          tracing::trace!(resource = R::NAME, %key, %cached_at, "serving cached list");
        }
        let envelope = Envelope::parse(result.data, R::LIST_KEYS);
        let pagination = envelope.pagination;
        let items = normalize_items::<R>(envelope.payload.into_items());
        tracing::debug!(resource = R::NAME, %key, count = items.len(), ?source, "list loaded");

        pending.complete(|state| {
          if query.append {
            for item in items {
              state.upsert(item);
            }
          } else {
            state.items = items;
          }
          state.pagination = pagination;
        });
        Ok(FetchOutcome::Applied(source))
      }
      Err(err) => {
        tracing::warn!(resource = R::NAME, %key, error = %err, "list fetch failed");
        pending.fail(&err);
        Err(err)
      }
    }
  }

  /// Fetch the page currently selected by the store's filters.
  pub async fn fetch_current(&self, limit: u32) -> Result<FetchOutcome, ApiError> {
    let query = ListQuery::from_filters(&self.filters(), limit);
    self.fetch_list(query).await
  }

  /// Append the page after the last one loaded, if the backend reports one.
  pub async fn load_more(&self, limit: u32) -> Result<FetchOutcome, ApiError> {
    let (filters, pagination) = {
      let state = lock(&self.state);
      (state.filters.clone(), state.pagination)
    };
    if !pagination.has_next {
      return Ok(FetchOutcome::Skipped);
    }
    let query = ListQuery::new(filters.active(), pagination.current_page + 1, limit, true);
    self.fetch_list(query).await
  }

  /// Fetch a single entity into `current`, refreshing its list entry.
  pub async fn fetch_one(&self, id: &str) -> Result<FetchOutcome, ApiError> {
    let Some(_in_flight) = InFlight::acquire(&self.item_in_flight) else {
      tracing::debug!(resource = R::NAME, id, "item fetch already in progress, dropping");
      return Ok(FetchOutcome::Skipped);
    };

    let seq = self.item_seq.fetch_add(1, Ordering::SeqCst) + 1;
    let token = self.cancel_token();
    let path = R::item_path(id);
    let key = RequestKey::path(&path);
    let pending = self.begin();

    let fetched = tokio::select! {
      _ = token.cancelled() => return Ok(FetchOutcome::Superseded),
      fetched = self
        .cache
        .fetch(&key, || self.client.get(&path, std::iter::empty::<(String, String)>())) => fetched,
    };

    if self.item_seq.load(Ordering::SeqCst) != seq {
      return Ok(FetchOutcome::Superseded);
    }

    let result = match fetched {
      Ok(result) => result,
      Err(err) => {
        tracing::warn!(resource = R::NAME, id, error = %err, "item fetch failed");
        pending.fail(&err);
        return Err(err);
      }
    };

    let source = result.source;
    let item = Envelope::parse(result.data, R::LIST_KEYS)
      .payload
      .into_single()
      .and_then(normalize_one::<R>);

    match item {
      Some(item) => {
        pending.complete(|state| {
          state.replace(&item);
          state.current = Some(item);
        });
        Ok(FetchOutcome::Applied(source))
      }
      None => {
        self.cache.cache().invalidate(&key);
        let err = ApiError::NotFound {
          message: self.client.messages().not_found.clone(),
        };
        pending.fail(&err);
        Err(err)
      }
    }
  }

  // ==========================================================================
  // Mutations
  // ==========================================================================

  /// Drop every cached query of this collection.
  pub fn invalidate_cache(&self) {
    self.cache.cache().invalidate_prefix(R::PATH);
  }

  /// Run a mutating request, then invalidate the collection and apply the
  /// local change. State is left untouched on failure.
  async fn mutate<T, Fut>(
    &self,
    request: Fut,
    apply: impl FnOnce(&mut StoreState<R>, Value) -> T,
  ) -> Result<T, ApiError>
  where
    Fut: Future<Output = Result<Value, ApiError>>,
  {
    let pending = self.begin();
    match request.await {
      Ok(value) => {
        self.invalidate_cache();
        Ok(pending.complete(|state| apply(state, value)))
      }
      Err(err) => {
        tracing::warn!(resource = R::NAME, error = %err, "mutation failed");
        pending.fail(&err);
        Err(err)
      }
    }
  }

  /// The entity echoed back by a mutation, if any.
  fn returned_entity(value: Value) -> Option<R> {
    Envelope::parse(value, R::LIST_KEYS)
      .payload
      .into_single()
      .and_then(normalize_one::<R>)
  }

  /// Create an entity; the echoed entity is appended to the list.
  pub async fn create(&self, body: Value) -> Result<Option<R>, ApiError> {
    self
      .mutate(self.client.post(R::PATH, body), |state, value| {
        let created = Self::returned_entity(value);
        if let Some(item) = &created {
          state.upsert(item.clone());
        }
        created
      })
      .await
  }

  /// Update an entity; the echoed entity replaces the one with the same id.
  pub async fn update(&self, id: &str, body: Value) -> Result<Option<R>, ApiError> {
    let path = R::item_path(id);
    self
      .mutate(self.client.put(&path, body), |state, value| {
        let updated = Self::returned_entity(value);
        if let Some(item) = &updated {
          state.replace(item);
        }
        updated
      })
      .await
  }

  pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
    let path = R::item_path(id);
    self
      .mutate(self.client.delete(&path), |state, _| state.remove(id))
      .await
  }

  /// POST an action on one entity (e.g. `/halakat/7/enroll`).
  async fn action<T>(
    &self,
    id: &str,
    action: &str,
    apply: impl FnOnce(&mut StoreState<R>, Value) -> T,
  ) -> Result<T, ApiError> {
    let path = format!("{}/{}", R::item_path(id), action);
    self.mutate(self.client.post(&path, json!({})), apply).await
  }

  /// Apply a local change to the entity with `id` without a refetch.
  ///
  /// The next real fetch overwrites it.
  pub fn patch_local(&self, id: &str, f: impl FnMut(&mut R)) -> bool {
    lock(&self.state).patch(id, f)
  }

  // ==========================================================================
  // Filters and lifecycle
  // ==========================================================================

  /// Merge a filter. Any key but `page` sends the page back to 1 and drops
  /// the collection's cached queries. Pending fetches are cancelled either way.
  pub fn set_filter(&self, key: &str, value: impl ToString) {
    let changed = lock(&self.state).filters.set(key, value);
    if key != filters::PAGE_KEY {
      self.invalidate_cache();
    }
    tracing::debug!(resource = R::NAME, key, changed, "filter set");
    self.cancel_pending();
  }

  pub fn clear_filters(&self) {
    lock(&self.state).filters.clear();
    self.invalidate_cache();
    self.cancel_pending();
  }

  /// Cancel in-flight fetches; their results are discarded.
  pub fn cancel_pending(&self) {
    self.list_seq.fetch_add(1, Ordering::SeqCst);
    self.item_seq.fetch_add(1, Ordering::SeqCst);
    let mut token = lock(&self.cancel);
    token.cancel();
    *token = CancellationToken::new();
  }

  /// Back to the initial empty state.
  pub fn reset(&self) {
    self.cancel_pending();
    lock(&self.state).reset();
  }
}

#[cfg(test)]
mod tests;
