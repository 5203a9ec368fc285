//! Handler for `GET /matches/:identity`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use unimatch_core::{
  engine::MatchEngine,
  matching::MatchView,
  profile::Identity,
  store::MatchStore,
};

use crate::error::ApiError;

/// `GET /matches/:identity` — the caller's matches, newest first, each with
/// the partner's current profile.
pub async fn list<S>(
  State(engine): State<Arc<MatchEngine<S>>>,
  Path(identity): Path<String>,
) -> Result<Json<Vec<MatchView>>, ApiError>
where
  S: MatchStore + 'static,
{
  let identity = Identity::new(identity)?;
  Ok(Json(engine.list_matches(&identity).await?))
}
