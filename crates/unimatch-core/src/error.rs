//! Error types for `unimatch-core`.

use thiserror::Error;

use crate::profile::Identity;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or self-referential input. Never retried.
  #[error("invalid input: {0}")]
  Validation(String),

  #[error("profile not found: {0}")]
  ProfileNotFound(Identity),

  #[error("no more profiles available for {0}")]
  NoCandidates(Identity),

  /// A uniqueness constraint rejected a write.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification of an [`Error`], used by transport layers to pick a
/// status code and by callers to decide whether a retry makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  NotFound,
  Conflict,
  Storage,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation(_) => ErrorKind::Validation,
      Self::ProfileNotFound(_) | Self::NoCandidates(_) => ErrorKind::NotFound,
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::Storage(_) => ErrorKind::Storage,
    }
  }

  pub(crate) fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }

  pub(crate) fn storage<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
