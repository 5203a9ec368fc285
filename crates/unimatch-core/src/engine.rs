//! [`MatchEngine`] — ledger rules, match formation and match queries on top of
//! any [`MatchStore`].
//!
//! The engine keeps no state of its own. Every guarantee it gives under
//! concurrency comes from the two atomic primitives the store provides: the
//! interaction upsert and the uniqueness constraint on canonical match pairs.
//! Several engines (in one process or many) may therefore share a backend.

use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  interaction::{Action, Interaction},
  matching::{CanonicalPair, Match, MatchOutcome, MatchView},
  profile::{Identity, NewProfile, Profile, ProfileUpdate},
  store::{MatchStore, StoreError},
};

/// The matching service facade used by the API layer.
#[derive(Debug, Clone)]
pub struct MatchEngine<S> {
  store: S,
}

impl<S: MatchStore> MatchEngine<S> {
  pub fn new(store: S) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Validate and persist a new profile.
  pub async fn register(&self, input: NewProfile) -> Result<Profile> {
    input.validate()?;
    let identity = input.identity.clone();
    match self.store.create_profile(input).await {
      Ok(profile) => {
        info!(%identity, "profile registered");
        Ok(profile)
      }
      Err(e) if e.is_conflict() => Err(Error::Conflict(format!(
        "{identity} or its email is already registered"
      ))),
      Err(e) => Err(Error::storage(e)),
    }
  }

  pub async fn profile(&self, identity: &Identity) -> Result<Profile> {
    self
      .store
      .get_profile(identity)
      .await
      .map_err(Error::storage)?
      .ok_or_else(|| Error::ProfileNotFound(identity.clone()))
  }

  pub async fn update_profile(
    &self,
    identity: &Identity,
    update: ProfileUpdate,
  ) -> Result<Profile> {
    update.validate()?;
    match self.store.update_profile(identity, update).await {
      Ok(Some(profile)) => Ok(profile),
      Ok(None) => Err(Error::ProfileNotFound(identity.clone())),
      Err(e) if e.is_conflict() => {
        Err(Error::Conflict("email is already registered".into()))
      }
      Err(e) => Err(Error::storage(e)),
    }
  }

  pub async fn delete_profile(&self, identity: &Identity) -> Result<Profile> {
    let removed = self
      .store
      .delete_profile(identity)
      .await
      .map_err(Error::storage)?
      .ok_or_else(|| Error::ProfileNotFound(identity.clone()))?;
    info!(%identity, "profile deleted");
    Ok(removed)
  }

  // ── Interaction ledger ────────────────────────────────────────────────

  /// Record the latest directional action from `actor` toward `target`.
  ///
  /// Contains no match logic: use [`Self::process_action`] for that.
  pub async fn record_action(
    &self,
    actor: &Identity,
    target: &Identity,
    action: Action,
  ) -> Result<Interaction> {
    if actor == target {
      return Err(Error::Validation(format!(
        "{actor} cannot interact with themselves"
      )));
    }
    self.require_profile(actor).await?;
    self.require_profile(target).await?;

    let interaction = self
      .store
      .upsert_interaction(actor, target, action)
      .await
      .map_err(Error::storage)?;
    debug!(%actor, %target, %action, "interaction recorded");
    Ok(interaction)
  }

  async fn require_profile(&self, identity: &Identity) -> Result<()> {
    let exists = self
      .store
      .profile_exists(identity)
      .await
      .map_err(Error::storage)?;
    if exists {
      Ok(())
    } else {
      Err(Error::ProfileNotFound(identity.clone()))
    }
  }

  // ── Match formation ───────────────────────────────────────────────────

  /// Record a like from `actor` toward `target` and resolve any match.
  pub async fn process_like(
    &self,
    actor: &Identity,
    target: &Identity,
  ) -> Result<MatchOutcome> {
    self.process_action(actor, target, Action::Like).await
  }

  /// Record an action and, for likes, create or fetch the canonical match if
  /// the target has already liked the actor back.
  ///
  /// Safe to call concurrently from both directions of a pair and safe to
  /// retry: repeated calls converge on the same ledger row and the same
  /// match.
  pub async fn process_action(
    &self,
    actor: &Identity,
    target: &Identity,
    action: Action,
  ) -> Result<MatchOutcome> {
    self.record_action(actor, target, action).await?;
    if !action.is_like() {
      return Ok(MatchOutcome::NoMatch);
    }

    // The like is already durable; resolution gets one retry so a transient
    // failure cannot silently drop a match.
    match self.resolve(actor, target).await {
      Ok(outcome) => Ok(outcome),
      Err(e) => {
        warn!(%actor, %target, error = %e, "match resolution failed, retrying once");
        self.resolve(actor, target).await.map_err(Error::storage)
      }
    }
  }

  async fn resolve(
    &self,
    actor: &Identity,
    target: &Identity,
  ) -> Result<MatchOutcome, S::Error> {
    let liked_back = self
      .store
      .find_interaction(target, actor)
      .await?
      .is_some_and(|reverse| reverse.action.is_like());
    if !liked_back {
      return Ok(MatchOutcome::NoMatch);
    }

    // `record_action` already rejected actor == target.
    let Ok(pair) = CanonicalPair::new(actor.clone(), target.clone()) else {
      return Ok(MatchOutcome::NoMatch);
    };
    self.find_or_create(&pair).await
  }

  async fn find_or_create(
    &self,
    pair: &CanonicalPair,
  ) -> Result<MatchOutcome, S::Error> {
    if let Some(existing) = self.store.find_match(pair).await? {
      return Ok(MatchOutcome::MatchAlreadyExisted(existing));
    }

    match self.store.insert_match(pair).await {
      Ok(created) => {
        info!(%pair, match_id = %created.match_id, "match created");
        Ok(MatchOutcome::MatchCreated(created))
      }
      Err(e) if e.is_conflict() => {
        // Lost the race: another request inserted the row between our lookup
        // and our insert. Its row is the match.
        debug!(%pair, "concurrent match insert won, re-reading");
        match self.store.find_match(pair).await? {
          Some(winner) => Ok(MatchOutcome::MatchAlreadyExisted(winner)),
          None => Err(e),
        }
      }
      Err(e) => Err(e),
    }
  }

  // ── Queries ───────────────────────────────────────────────────────────

  /// All matches of `identity`, newest first, each resolved to the partner's
  /// current profile. Matches whose partner no longer exists are skipped.
  pub async fn list_matches(&self, identity: &Identity) -> Result<Vec<MatchView>> {
    self.require_profile(identity).await?;

    let matches = self
      .store
      .matches_for(identity)
      .await
      .map_err(Error::storage)?;

    let mut views = Vec::with_capacity(matches.len());
    for m in matches {
      match self.match_view(&m, identity).await? {
        Some(view) => views.push(view),
        None => {
          debug!(%identity, match_id = %m.match_id, "partner profile gone, skipping match");
        }
      }
    }
    Ok(views)
  }

  /// `m` from the point of view of `identity`, or `None` if the partner
  /// cannot be resolved.
  pub async fn match_view(
    &self,
    m: &Match,
    identity: &Identity,
  ) -> Result<Option<MatchView>> {
    let partner = self.resolve_partner(m, identity).await?;
    Ok(partner.map(|partner| MatchView {
      match_id: m.match_id,
      matched_at: m.created_at,
      partner,
    }))
  }

  /// The profile of the party in `m` that is not `identity`.
  pub async fn resolve_partner(
    &self,
    m: &Match,
    identity: &Identity,
  ) -> Result<Option<Profile>> {
    let Some(partner_id) = m.partner_of(identity) else {
      return Ok(None);
    };
    self
      .store
      .get_profile(partner_id)
      .await
      .map_err(Error::storage)
  }

  /// One active profile `requester` has not acted on yet, chosen at random.
  pub async fn pick_candidate(&self, requester: &Identity) -> Result<Profile> {
    self.require_profile(requester).await?;
    self
      .store
      .random_candidate(requester)
      .await
      .map_err(Error::storage)?
      .ok_or_else(|| Error::NoCandidates(requester.clone()))
  }
}
