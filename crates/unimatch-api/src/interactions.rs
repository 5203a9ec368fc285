//! Handler for `POST /interactions`: record a like or dislike and report any
//! resulting match.

use std::sync::Arc;

use axum::{Json, extract::State};
use unimatch_core::{
  engine::MatchEngine,
  interaction::Action,
  store::MatchStore,
  wire::{ActionRequest, ActionResponse},
};

use crate::error::ApiError;

/// `POST /interactions` — body: [`ActionRequest`].
///
/// On a match the response carries the target's profile, so the caller can
/// congratulate the actor straight away.
pub async fn record<S>(
  State(engine): State<Arc<MatchEngine<S>>>,
  Json(body): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError>
where
  S: MatchStore + 'static,
{
  let action = Action::parse(&body.action)?;
  let outcome = engine
    .process_action(&body.actor, &body.target, action)
    .await?;

  let matched = match outcome.matched() {
    Some(m) => engine.match_view(m, &body.actor).await?,
    None => None,
  };

  Ok(Json(ActionResponse::recorded(&outcome, matched)))
}
