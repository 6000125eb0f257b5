//! One signed-in (or anonymous) client session.
//!
//! Every store shares the same HTTP client and request cache, so a token
//! change or logout is visible to all of them at once.

use color_eyre::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::api::types::{Halaka, Invitation, StudentProfile, TeacherProfile};
use crate::api::HttpClient;
use crate::cache::RequestCache;
use crate::config::Config;
use crate::store::ResourceStore;

pub struct Session {
  client: HttpClient,
  cache: Arc<RequestCache>,
  pub halakat: Arc<ResourceStore<Halaka>>,
  pub teachers: Arc<ResourceStore<TeacherProfile>>,
  pub students: Arc<ResourceStore<StudentProfile>>,
  pub invitations: Arc<ResourceStore<Invitation>>,
  sweeper: Option<JoinHandle<()>>,
  page_size: u32,
}

impl Session {
  /// Build the client and stores from config. Must run inside a tokio
  /// runtime when the cache sweep is enabled.
  pub fn new(config: &Config) -> Result<Self> {
    let client = HttpClient::new(
      &config.api.base_url,
      config.api.timeout(),
      config.messages.clone(),
    )?;
    client.set_token(Config::get_api_token());

    let cache = Arc::new(RequestCache::with_ttl(config.cache.ttl()));
    let sweeper = config
      .cache
      .sweep_interval()
      .map(|interval| cache.spawn_sweeper(interval));

    tracing::debug!(
      base_url = %config.api.base_url,
      authenticated = client.has_token(),
      "session created"
    );

    Ok(Self {
      halakat: Arc::new(ResourceStore::new(client.clone(), cache.clone())),
      teachers: Arc::new(ResourceStore::new(client.clone(), cache.clone())),
      students: Arc::new(ResourceStore::new(client.clone(), cache.clone())),
      invitations: Arc::new(ResourceStore::new(client.clone(), cache.clone())),
      client,
      cache,
      sweeper,
      page_size: config.page_size.max(1),
    })
  }

  pub fn cache(&self) -> &Arc<RequestCache> {
    &self.cache
  }

  pub fn page_size(&self) -> u32 {
    self.page_size
  }

  pub fn is_authenticated(&self) -> bool {
    self.client.has_token()
  }

  /// Switch to another user's token. Cached responses belong to the
  /// previous identity and are dropped.
  pub fn login(&self, token: impl Into<String>) {
    self.client.set_token(Some(token.into()));
    self.cache.clear();
    self.reset_stores();
  }

  /// Forget the token, every cached response and all store state.
  pub fn logout(&self) {
    self.client.clear_token();
    self.cache.clear();
    self.reset_stores();
    tracing::info!("logged out");
  }

  fn reset_stores(&self) {
    self.halakat.reset();
    self.teachers.reset();
    self.students.reset();
    self.invitations.reset();
  }
}

impl Drop for Session {
  fn drop(&mut self) {
    if let Some(handle) = self.sweeper.take() {
      handle.abort();
    }
  }
}
