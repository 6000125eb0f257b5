//! Periodic background refresh of a store.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{FetchOutcome, Resource, ResourceStore};
use crate::api::ApiError;
use crate::cache::CacheSource;

/// Refresh events
#[derive(Debug)]
pub enum RefreshEvent {
  /// The store was reloaded
  Updated(CacheSource),
  /// The reload failed; the store kept its previous items
  Failed(ApiError),
}

/// Polls a store's current page on a fixed interval.
///
/// Every tick drops the collection's cached queries and refetches, so the
/// store tracks the backend without waiting for the cache TTL. Stops when
/// stopped, dropped, or when the receiving side is gone.
pub struct Refresher {
  rx: mpsc::UnboundedReceiver<RefreshEvent>,
  cancel: CancellationToken,
  handle: JoinHandle<()>,
}

impl Refresher {
  /// Start refreshing; the first reload happens immediately.
  pub fn spawn<R: Resource>(store: Arc<ResourceStore<R>>, interval: Duration, limit: u32) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let stop = cancel.clone();

    let handle = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

      loop {
        tokio::select! {
          _ = stop.cancelled() => break,
          _ = ticker.tick() => {}
        }

        store.invalidate_cache();
        let event = match store.fetch_current(limit).await {
          Ok(FetchOutcome::Applied(source)) => RefreshEvent::Updated(source),
          Ok(outcome) => {
            tracing::trace!(resource = R::NAME, ?outcome, "refresh produced no update");
            continue;
          }
          Err(err) => RefreshEvent::Failed(err),
        };

        if tx.send(event).is_err() {
          break;
        }
      }
      tracing::debug!(resource = R::NAME, "refresher stopped");
    });

    Self { rx, cancel, handle }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<RefreshEvent> {
    self.rx.recv().await
  }

  pub fn stop(&self) {
    self.cancel.cancel();
  }

  pub fn is_finished(&self) -> bool {
    self.handle.is_finished()
  }
}

impl Drop for Refresher {
  fn drop(&mut self) {
    self.cancel.cancel();
  }
}
