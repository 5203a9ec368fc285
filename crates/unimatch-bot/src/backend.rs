//! The [`Backend`] trait: what the conversation layer needs from the
//! matching service, independent of how it is reached.

use std::future::Future;

use serde::Deserialize;
use thiserror::Error;
use unimatch_core::{
  interaction::Action,
  matching::MatchView,
  profile::{Identity, NewProfile, Profile, ProfileUpdate},
  wire::ActionResponse,
};

/// Error classes reported in the `kind` field of an API error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  Validation,
  NotFound,
  Conflict,
  Storage,
  Unauthorized,
  #[serde(other)]
  Other,
}

#[derive(Debug, Error)]
pub enum BackendError {
  /// The service understood the request and refused it.
  #[error("{message}")]
  Rejected { kind: FailureKind, message: String },

  /// The service could not be reached or answered with something unreadable.
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),
}

impl BackendError {
  pub fn kind(&self) -> Option<FailureKind> {
    match self {
      Self::Rejected { kind, .. } => Some(*kind),
      Self::Transport(_) => None,
    }
  }

  pub fn is_not_found(&self) -> bool { self.kind() == Some(FailureKind::NotFound) }
}

pub type Result<T, E = BackendError> = std::result::Result<T, E>;

/// Profile, ledger and match operations as seen by the bot.
pub trait Backend: Send + Sync {
  /// `None` when `identity` has not registered.
  fn profile<'a>(
    &'a self,
    identity: &'a Identity,
  ) -> impl Future<Output = Result<Option<Profile>>> + Send + 'a;

  fn register(
    &self,
    profile: NewProfile,
  ) -> impl Future<Output = Result<Profile>> + Send + '_;

  fn update<'a>(
    &'a self,
    identity: &'a Identity,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Profile>> + Send + 'a;

  fn delete<'a>(
    &'a self,
    identity: &'a Identity,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// A random profile `identity` has not acted on, or `None` once there are
  /// none left.
  fn candidate<'a>(
    &'a self,
    identity: &'a Identity,
  ) -> impl Future<Output = Result<Option<Profile>>> + Send + 'a;

  fn act<'a>(
    &'a self,
    actor: &'a Identity,
    target: &'a Identity,
    action: Action,
  ) -> impl Future<Output = Result<ActionResponse>> + Send + 'a;

  /// Newest first.
  fn matches<'a>(
    &'a self,
    identity: &'a Identity,
  ) -> impl Future<Output = Result<Vec<MatchView>>> + Send + 'a;
}
