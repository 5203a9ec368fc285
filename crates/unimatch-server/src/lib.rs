//! HTTP server for unimatch.
//!
//! Wraps the [`unimatch_api`] router with basic auth and request tracing, and
//! mounts it under `/api`.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use unimatch_core::{engine::MatchEngine, store::MatchStore};

use auth::{AuthConfig, require_auth};

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8000 }

fn default_store_path() -> PathBuf { PathBuf::from("unimatch.db") }

/// Runtime server configuration, deserialised from `config.toml` and
/// `UNIMATCH_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
}

impl ServerConfig {
  pub fn auth(&self) -> AuthConfig {
    AuthConfig {
      username:      self.auth_username.clone(),
      password_hash: self.auth_password_hash.clone(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the router needs to serve requests.
#[derive(Clone)]
pub struct AppState<S> {
  pub engine: Arc<MatchEngine<S>>,
  pub auth:   Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full server [`Router`]: the JSON API under `/api`, behind basic
/// auth, with every request traced.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: MatchStore + 'static,
{
  Router::new()
    .nest("/api", unimatch_api::api_router(state.engine))
    .layer(middleware::from_fn_with_state(state.auth, require_auth))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
