//! The `MatchStore` trait: everything the engine needs from a backend.
//!
//! The trait is implemented by storage backends (e.g. `unimatch-store-sqlite`).
//! Higher layers (`unimatch-api`, `unimatch-server`) go through
//! [`crate::engine::MatchEngine`], never straight to a backend.
//!
//! Backends must enforce two constraints atomically, because the engine holds
//! no locks of its own:
//!
//! - one interaction row per ordered `(actor, target)` pair, written with a
//!   single upsert statement;
//! - one match row per [`CanonicalPair`], with a violation reported as an
//!   error whose [`StoreError::is_conflict`] returns `true`.

use std::future::Future;

use crate::{
  interaction::{Action, Interaction},
  matching::{CanonicalPair, Match},
  profile::{Identity, NewProfile, Profile, ProfileUpdate},
};

/// Backend errors must say whether they were caused by a uniqueness
/// constraint, so the engine can tell a lost race from a real failure.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn is_conflict(&self) -> bool;
}

/// Abstraction over a unimatch storage backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait MatchStore: Send + Sync {
  type Error: StoreError;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Persist a new profile. A taken identity or email is a conflict.
  fn create_profile(
    &self,
    input: NewProfile,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;

  /// Retrieve a profile by identity. Returns `None` if not found.
  fn get_profile<'a>(
    &'a self,
    identity: &'a Identity,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  /// Replace every mutable field. Returns `None` if the profile is unknown.
  fn update_profile<'a>(
    &'a self,
    identity: &'a Identity,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  /// Remove a profile together with its interactions and matches. Returns the
  /// removed record, or `None` if there was nothing to remove.
  fn delete_profile<'a>(
    &'a self,
    identity: &'a Identity,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  fn profile_exists<'a>(
    &'a self,
    identity: &'a Identity,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// `false` for unknown profiles as well as deactivated ones.
  fn is_active<'a>(
    &'a self,
    identity: &'a Identity,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// A random active profile that `requester` has not acted on yet.
  fn random_candidate<'a>(
    &'a self,
    requester: &'a Identity,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  // ── Interaction ledger ────────────────────────────────────────────────

  /// Insert or overwrite the `(actor, target)` row in one atomic statement
  /// and return its post-write state. The timestamp is set by the store.
  fn upsert_interaction<'a>(
    &'a self,
    actor: &'a Identity,
    target: &'a Identity,
    action: Action,
  ) -> impl Future<Output = Result<Interaction, Self::Error>> + Send + 'a;

  fn find_interaction<'a>(
    &'a self,
    actor: &'a Identity,
    target: &'a Identity,
  ) -> impl Future<Output = Result<Option<Interaction>, Self::Error>> + Send + 'a;

  // ── Matches ───────────────────────────────────────────────────────────

  fn find_match<'a>(
    &'a self,
    pair: &'a CanonicalPair,
  ) -> impl Future<Output = Result<Option<Match>, Self::Error>> + Send + 'a;

  /// Insert a new match for `pair`. Must fail with a conflict error if a row
  /// for the pair already exists; never overwrites.
  fn insert_match<'a>(
    &'a self,
    pair: &'a CanonicalPair,
  ) -> impl Future<Output = Result<Match, Self::Error>> + Send + 'a;

  /// Every match with `identity` in either slot, newest first.
  fn matches_for<'a>(
    &'a self,
    identity: &'a Identity,
  ) -> impl Future<Output = Result<Vec<Match>, Self::Error>> + Send + 'a;
}
