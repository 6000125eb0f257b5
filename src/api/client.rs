use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use url::Url;

use super::error::{ApiError, ErrorMessages};

/// Name of the transport cache-busting query parameter added to GETs.
pub const CACHE_BUST_PARAM: &str = "_t";

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
  pub params: Vec<(String, String)>,
  pub body: Option<Value>,
  /// Overrides the session token for this request
  pub token: Option<String>,
}

impl RequestOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn params<I, K, V>(mut self, params: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
  {
    self
      .params
      .extend(params.into_iter().map(|(k, v)| (k.into(), v.to_string())));
    self
  }

  pub fn body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  pub fn token(mut self, token: impl Into<String>) -> Self {
    self.token = Some(token.into());
    self
  }
}

/// Backend API client wrapper.
///
/// Attaches the bearer token, enforces the request timeout and turns every
/// failure into a classified [`ApiError`]. Never retries.
#[derive(Clone)]
pub struct HttpClient {
  client: reqwest::Client,
  base_url: Url,
  token: Arc<RwLock<Option<String>>>,
  messages: Arc<ErrorMessages>,
}

impl HttpClient {
  pub fn new(base_url: &str, timeout: Duration, messages: ErrorMessages) -> Result<Self> {
    // Url::join drops the last segment unless the base ends with '/'
    let normalized = format!("{}/", base_url.trim_end_matches('/'));
    let base_url =
      Url::parse(&normalized).map_err(|e| eyre!("Invalid API base URL {}: {}", base_url, e))?;

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url,
      token: Arc::new(RwLock::new(None)),
      messages: Arc::new(messages),
    })
  }

  pub fn messages(&self) -> &ErrorMessages {
    &self.messages
  }

  /// Set the bearer token used when a request carries none of its own.
  pub fn set_token(&self, token: Option<String>) {
    *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
  }

  pub fn clear_token(&self) {
    self.set_token(None);
  }

  pub fn has_token(&self) -> bool {
    self.current_token().is_some()
  }

  fn current_token(&self) -> Option<String> {
    self
      .token
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  fn url_for(&self, path: &str) -> Result<Url, ApiError> {
    self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| {
        tracing::warn!(path, error = %e, "invalid request path");
        ApiError::Rejected {
          status: 0,
          message: self.messages.generic.clone(),
        }
      })
  }

  /// Perform a request and return the parsed JSON body.
  ///
  /// Empty success bodies come back as `Value::Null`.
  pub async fn call(
    &self,
    method: Method,
    path: &str,
    options: RequestOptions,
  ) -> Result<Value, ApiError> {
    let url = self.url_for(path)?;
    let mut params = options.params;
    if method == Method::GET {
      params.push((
        CACHE_BUST_PARAM.to_string(),
        Utc::now().timestamp_millis().to_string(),
      ));
    }

    let mut request = self.client.request(method.clone(), url);
    if !params.is_empty() {
      request = request.query(&params);
    }
    if let Some(token) = options.token.or_else(|| self.current_token()) {
      request = request.bearer_auth(token);
    }
    if let Some(body) = &options.body {
      request = request.json(body);
    }

    tracing::debug!(%method, path, "api request");

    let response = request.send().await.map_err(|e| {
      tracing::warn!(%method, path, timeout = e.is_timeout(), error = %e, "no response");
      ApiError::connectivity(&self.messages)
    })?;

    let status = response.status();
    let bytes = response.bytes().await.map_err(|e| {
      tracing::warn!(%method, path, error = %e, "failed to read response body");
      ApiError::connectivity(&self.messages)
    })?;

    let body: Option<Value> = if bytes.is_empty() {
      None
    } else {
      serde_json::from_slice(&bytes).ok()
    };

    if !status.is_success() {
      let backend_message = body.as_ref().and_then(backend_message);
      let err = ApiError::from_status(status, backend_message, &self.messages);
      tracing::warn!(%method, path, status = status.as_u16(), kind = ?err.kind(), "api error");
      return Err(err);
    }

    match body {
      Some(value) if is_error_envelope(&value) => {
        let err = ApiError::Rejected {
          status: status.as_u16(),
          message: backend_message(&value).unwrap_or_else(|| self.messages.generic.clone()),
        };
        tracing::warn!(%method, path, "backend reported an error envelope");
        Err(err)
      }
      Some(value) => Ok(value),
      None if bytes.is_empty() => Ok(Value::Null),
      None => {
        tracing::warn!(%method, path, "response body is not JSON");
        Err(ApiError::decode(&self.messages))
      }
    }
  }

  pub async fn get<I, K, V>(&self, path: &str, params: I) -> Result<Value, ApiError>
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
  {
    self
      .call(Method::GET, path, RequestOptions::new().params(params))
      .await
  }

  pub async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
    self
      .call(Method::POST, path, RequestOptions::new().body(body))
      .await
  }

  pub async fn put(&self, path: &str, body: Value) -> Result<Value, ApiError> {
    self
      .call(Method::PUT, path, RequestOptions::new().body(body))
      .await
  }

  pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
    self.call(Method::DELETE, path, RequestOptions::new()).await
  }
}

fn backend_message(body: &Value) -> Option<String> {
  body
    .get("message")
    .or_else(|| body.get("error"))
    .and_then(Value::as_str)
    .filter(|m| !m.trim().is_empty())
    .map(String::from)
}

fn is_error_envelope(body: &Value) -> bool {
  body
    .get("status")
    .and_then(Value::as_str)
    .is_some_and(|s| s.eq_ignore_ascii_case("error") || s.eq_ignore_ascii_case("fail"))
}
