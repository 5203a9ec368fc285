//! JSON REST API for unimatch.
//!
//! Exposes an axum [`Router`] backed by a [`MatchEngine`] over any
//! [`unimatch_core::store::MatchStore`]. Auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", unimatch_api::api_router(engine.clone()))
//! ```

pub mod error;
pub mod interactions;
pub mod matches;
pub mod profiles;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, post},
};
use unimatch_core::{engine::MatchEngine, store::MatchStore, wire::ServiceInfo};

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<MatchEngine<S>>) -> Router<()>
where
  S: MatchStore + 'static,
{
  Router::new()
    .route("/", get(info))
    // Profiles
    .route("/profiles", post(profiles::create::<S>))
    .route(
      "/profiles/{identity}",
      get(profiles::get_one::<S>)
        .put(profiles::update::<S>)
        .delete(profiles::delete::<S>),
    )
    .route("/profiles/{identity}/candidate", get(profiles::candidate::<S>))
    // Ledger
    .route("/interactions", post(interactions::record::<S>))
    // Matches
    .route("/matches/{identity}", get(matches::list::<S>))
    .with_state(engine)
}

/// `GET /` — name and version of the running service.
async fn info() -> Json<ServiceInfo> {
  Json(ServiceInfo {
    name:        "unimatch".to_owned(),
    version:     env!("CARGO_PKG_VERSION").to_owned(),
    description: "Student matching service".to_owned(),
  })
}
