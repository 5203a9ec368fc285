//! Handlers for `/profiles` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/profiles` | Body: [`NewProfile`]; 201, 409 if identity or email is taken |
//! | `GET`    | `/profiles/:identity` | 404 if not registered |
//! | `PUT`    | `/profiles/:identity` | Body: [`ProfileUpdate`]; identity is immutable |
//! | `DELETE` | `/profiles/:identity` | Returns the removed profile |
//! | `GET`    | `/profiles/:identity/candidate` | A random profile not yet acted on |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use unimatch_core::{
  engine::MatchEngine,
  profile::{Identity, NewProfile, Profile, ProfileUpdate},
  store::MatchStore,
};

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /profiles` — returns 201 + the stored [`Profile`].
pub async fn create<S>(
  State(engine): State<Arc<MatchEngine<S>>>,
  Json(body): Json<NewProfile>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MatchStore + 'static,
{
  let profile = engine.register(body).await?;
  Ok((StatusCode::CREATED, Json(profile)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /profiles/:identity`
pub async fn get_one<S>(
  State(engine): State<Arc<MatchEngine<S>>>,
  Path(identity): Path<String>,
) -> Result<Json<Profile>, ApiError>
where
  S: MatchStore + 'static,
{
  let identity = Identity::new(identity)?;
  Ok(Json(engine.profile(&identity).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /profiles/:identity` — replaces every mutable field.
pub async fn update<S>(
  State(engine): State<Arc<MatchEngine<S>>>,
  Path(identity): Path<String>,
  Json(body): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ApiError>
where
  S: MatchStore + 'static,
{
  let identity = Identity::new(identity)?;
  Ok(Json(engine.update_profile(&identity, body).await?))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /profiles/:identity` — also removes the profile's interactions and
/// matches.
pub async fn delete<S>(
  State(engine): State<Arc<MatchEngine<S>>>,
  Path(identity): Path<String>,
) -> Result<Json<Profile>, ApiError>
where
  S: MatchStore + 'static,
{
  let identity = Identity::new(identity)?;
  Ok(Json(engine.delete_profile(&identity).await?))
}

// ─── Candidate ────────────────────────────────────────────────────────────────

/// `GET /profiles/:identity/candidate` — 404 when nobody is left to show.
pub async fn candidate<S>(
  State(engine): State<Arc<MatchEngine<S>>>,
  Path(identity): Path<String>,
) -> Result<Json<Profile>, ApiError>
where
  S: MatchStore + 'static,
{
  let identity = Identity::new(identity)?;
  Ok(Json(engine.pick_candidate(&identity).await?))
}
