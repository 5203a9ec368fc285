//! Async HTTP client wrapping the unimatch JSON API.

use std::time::Duration;

use anyhow::Context as _;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use unimatch_core::{
  interaction::Action,
  matching::MatchView,
  profile::{Identity, NewProfile, Profile, ProfileUpdate},
  wire::{ActionRequest, ActionResponse},
};

use crate::backend::{Backend, BackendError, FailureKind, Result};

/// Connection settings for the unimatch API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Async HTTP client for the unimatch JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

/// Error body produced by the API for every non-2xx response.
#[derive(Deserialize)]
struct ErrorBody {
  error: String,
  kind:  FailureKind,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  async fn send(&self, req: RequestBuilder) -> Result<Response> {
    let resp = self.auth(req).send().await?;
    if resp.status().is_success() {
      return Ok(resp);
    }

    let status = resp.status();
    let (kind, message) = match resp.json::<ErrorBody>().await {
      Ok(body) => (body.kind, body.error),
      Err(_) => (fallback_kind(status), status.to_string()),
    };
    tracing::debug!(%status, ?kind, %message, "API rejected request");
    Err(BackendError::Rejected { kind, message })
  }

  async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
    Ok(self.send(req).await?.json().await?)
  }

  /// Like [`Self::json`], but a 404 becomes `None`.
  async fn optional<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Option<T>> {
    match self.json(req).await {
      Ok(value) => Ok(Some(value)),
      Err(e) if e.is_not_found() => Ok(None),
      Err(e) => Err(e),
    }
  }
}

fn fallback_kind(status: StatusCode) -> FailureKind {
  match status {
    StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => FailureKind::Validation,
    StatusCode::NOT_FOUND => FailureKind::NotFound,
    StatusCode::CONFLICT => FailureKind::Conflict,
    StatusCode::UNAUTHORIZED => FailureKind::Unauthorized,
    s if s.is_server_error() => FailureKind::Storage,
    _ => FailureKind::Other,
  }
}

impl Backend for ApiClient {
  /// `GET /api/profiles/{identity}`
  async fn profile(&self, identity: &Identity) -> Result<Option<Profile>> {
    let url = self.url(&format!("/profiles/{identity}"));
    self.optional(self.client.get(url)).await
  }

  /// `POST /api/profiles`
  async fn register(&self, profile: NewProfile) -> Result<Profile> {
    let url = self.url("/profiles");
    self.json(self.client.post(url).json(&profile)).await
  }

  /// `PUT /api/profiles/{identity}`
  async fn update(&self, identity: &Identity, update: ProfileUpdate) -> Result<Profile> {
    let url = self.url(&format!("/profiles/{identity}"));
    self.json(self.client.put(url).json(&update)).await
  }

  /// `DELETE /api/profiles/{identity}`
  async fn delete(&self, identity: &Identity) -> Result<()> {
    let url = self.url(&format!("/profiles/{identity}"));
    self.send(self.client.delete(url)).await?;
    Ok(())
  }

  /// `GET /api/profiles/{identity}/candidate`
  async fn candidate(&self, identity: &Identity) -> Result<Option<Profile>> {
    let url = self.url(&format!("/profiles/{identity}/candidate"));
    self.optional(self.client.get(url)).await
  }

  /// `POST /api/interactions`
  async fn act(
    &self,
    actor: &Identity,
    target: &Identity,
    action: Action,
  ) -> Result<ActionResponse> {
    let body = ActionRequest {
      actor:  actor.clone(),
      target: target.clone(),
      action: action.to_string(),
    };
    let url = self.url("/interactions");
    self.json(self.client.post(url).json(&body)).await
  }

  /// `GET /api/matches/{identity}`
  async fn matches(&self, identity: &Identity) -> Result<Vec<MatchView>> {
    let url = self.url(&format!("/matches/{identity}"));
    self.json(self.client.get(url)).await
  }
}
