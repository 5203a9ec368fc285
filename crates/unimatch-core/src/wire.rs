//! JSON shapes shared by the REST API and its clients.

use serde::{Deserialize, Serialize};

use crate::{
  matching::{MatchOutcome, MatchView},
  profile::Identity,
};

/// Body of `POST /interactions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
  pub actor:  Identity,
  pub target: Identity,
  /// `"like"` or `"dislike"`, any case.
  pub action: String,
}

/// Discriminant of a [`MatchOutcome`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
  NoMatch,
  MatchCreated,
  MatchAlreadyExisted,
}

impl From<&MatchOutcome> for OutcomeKind {
  fn from(o: &MatchOutcome) -> Self {
    match o {
      MatchOutcome::NoMatch => Self::NoMatch,
      MatchOutcome::MatchCreated(_) => Self::MatchCreated,
      MatchOutcome::MatchAlreadyExisted(_) => Self::MatchAlreadyExisted,
    }
  }
}

/// Response of `POST /interactions`, from the actor's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
  /// Always `"recorded"` on success.
  pub status:   String,
  pub is_match: bool,
  pub outcome:  OutcomeKind,
  /// The match with the target's profile, when there is one and the target
  /// could be resolved.
  #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
  pub matched:  Option<MatchView>,
}

impl ActionResponse {
  /// A successful response for `outcome`, with the match rendered for the
  /// actor when there is one.
  pub fn recorded(outcome: &MatchOutcome, matched: Option<MatchView>) -> Self {
    Self {
      status: "recorded".to_owned(),
      is_match: outcome.is_match(),
      outcome: OutcomeKind::from(outcome),
      matched,
    }
  }
}

/// Service description returned by `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
  pub name:        String,
  pub version:     String,
  pub description: String,
}
