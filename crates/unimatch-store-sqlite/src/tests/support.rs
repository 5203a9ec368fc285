//! Fixtures and a fault-injecting store wrapper.

use std::sync::{
  Mutex,
  atomic::{AtomicBool, AtomicUsize, Ordering},
};

use unimatch_core::{
  engine::MatchEngine,
  interaction::{Action, Interaction},
  matching::{CanonicalPair, Match},
  profile::{Gender, Identity, NewProfile, Profile, ProfileUpdate},
  store::MatchStore,
};

use crate::{Error, Result, SqliteStore};

pub async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

pub fn id(s: &str) -> Identity { Identity::new(s).expect("valid identity") }

pub fn new_profile(identity: &str) -> NewProfile {
  NewProfile {
    identity:    id(identity),
    email:       format!("{identity}@e.ntu.edu.sg"),
    name:        identity.to_uppercase(),
    age:         21,
    gender:      Gender::Other,
    hobby:       "climbing".into(),
    description: "hello".into(),
    picture_id:  None,
  }
}

/// An engine over a fresh in-memory store with the given profiles registered.
pub async fn engine_with(identities: &[&str]) -> MatchEngine<SqliteStore> {
  let engine = MatchEngine::new(store().await);
  for identity in identities {
    engine.register(new_profile(identity)).await.unwrap();
  }
  engine
}

// ─── Fault injection ─────────────────────────────────────────────────────────

/// Delegates to a [`SqliteStore`] but can be told to misbehave:
///
/// - `blind_lookups`: the next N `find_match` calls report nothing, so the
///   engine goes on to insert a row that already exists;
/// - `failing_inserts`: the next N `insert_match` calls fail with a
///   non-conflict error;
/// - `hidden`: `get_profile` pretends these identities do not exist.
pub struct Faulty {
  pub inner:           SqliteStore,
  pub blind_lookups:   AtomicUsize,
  pub failing_inserts: AtomicUsize,
  pub hidden:          Mutex<Vec<Identity>>,
  pub saw_conflict:    AtomicBool,
}

impl Faulty {
  pub fn new(inner: SqliteStore) -> Self {
    Self {
      inner,
      blind_lookups: AtomicUsize::new(0),
      failing_inserts: AtomicUsize::new(0),
      hidden: Mutex::new(Vec::new()),
      saw_conflict: AtomicBool::new(false),
    }
  }

  fn take(counter: &AtomicUsize) -> bool {
    counter
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok()
  }
}

impl MatchStore for Faulty {
  type Error = Error;

  async fn create_profile(&self, input: NewProfile) -> Result<Profile> {
    self.inner.create_profile(input).await
  }

  async fn get_profile(&self, identity: &Identity) -> Result<Option<Profile>> {
    if self.hidden.lock().unwrap().contains(identity) {
      return Ok(None);
    }
    self.inner.get_profile(identity).await
  }

  async fn update_profile(
    &self,
    identity: &Identity,
    update: ProfileUpdate,
  ) -> Result<Option<Profile>> {
    self.inner.update_profile(identity, update).await
  }

  async fn delete_profile(&self, identity: &Identity) -> Result<Option<Profile>> {
    self.inner.delete_profile(identity).await
  }

  async fn profile_exists(&self, identity: &Identity) -> Result<bool> {
    self.inner.profile_exists(identity).await
  }

  async fn is_active(&self, identity: &Identity) -> Result<bool> {
    self.inner.is_active(identity).await
  }

  async fn random_candidate(&self, requester: &Identity) -> Result<Option<Profile>> {
    self.inner.random_candidate(requester).await
  }

  async fn upsert_interaction(
    &self,
    actor: &Identity,
    target: &Identity,
    action: Action,
  ) -> Result<Interaction> {
    self.inner.upsert_interaction(actor, target, action).await
  }

  async fn find_interaction(
    &self,
    actor: &Identity,
    target: &Identity,
  ) -> Result<Option<Interaction>> {
    self.inner.find_interaction(actor, target).await
  }

  async fn find_match(&self, pair: &CanonicalPair) -> Result<Option<Match>> {
    if Self::take(&self.blind_lookups) {
      return Ok(None);
    }
    self.inner.find_match(pair).await
  }

  async fn insert_match(&self, pair: &CanonicalPair) -> Result<Match> {
    if Self::take(&self.failing_inserts) {
      return Err(Error::Decode("injected transient failure".into()));
    }
    let result = self.inner.insert_match(pair).await;
    if let Err(e) = &result {
      use unimatch_core::store::StoreError as _;
      if e.is_conflict() {
        self.saw_conflict.store(true, Ordering::SeqCst);
      }
    }
    result
  }

  async fn matches_for(&self, identity: &Identity) -> Result<Vec<Match>> {
    self.inner.matches_for(identity).await
  }
}
