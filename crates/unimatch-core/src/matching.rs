//! Matches — symmetric records created once two likes meet.
//!
//! A match is keyed by a [`CanonicalPair`]: the two identities sorted by their
//! total order and assigned to fixed `first`/`second` slots. Whichever side
//! detects the mutual like, both converge on the same key, and the storage
//! layer's uniqueness constraint on that key makes creation exactly-once.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  profile::{Identity, Profile},
};

// ─── Canonical pair ──────────────────────────────────────────────────────────

/// An unordered pair of distinct identities with `first < second`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CanonicalPair {
  first:  Identity,
  second: Identity,
}

impl CanonicalPair {
  /// Order `a` and `b`; fails if they are the same identity.
  pub fn new(a: Identity, b: Identity) -> Result<Self> {
    match a.cmp(&b) {
      std::cmp::Ordering::Less => Ok(Self { first: a, second: b }),
      std::cmp::Ordering::Greater => Ok(Self { first: b, second: a }),
      std::cmp::Ordering::Equal => {
        Err(Error::Validation(format!("{a} cannot be paired with itself")))
      }
    }
  }

  pub fn first(&self) -> &Identity { &self.first }

  pub fn second(&self) -> &Identity { &self.second }
}

impl fmt::Display for CanonicalPair {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{{{}, {}}}", self.first, self.second)
  }
}

// ─── Match ───────────────────────────────────────────────────────────────────

/// A persisted mutual like. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
  pub match_id:   Uuid,
  pub first:      Identity,
  pub second:     Identity,
  pub created_at: DateTime<Utc>,
}

impl Match {
  pub fn pair(&self) -> CanonicalPair {
    CanonicalPair {
      first:  self.first.clone(),
      second: self.second.clone(),
    }
  }

  pub fn partner_of(&self, identity: &Identity) -> Option<&Identity> {
    if &self.first == identity {
      Some(&self.second)
    } else if &self.second == identity {
      Some(&self.first)
    } else {
      None
    }
  }
}

// ─── Outcomes and views ──────────────────────────────────────────────────────

/// What [`crate::engine::MatchEngine::process_action`] concluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "match", rename_all = "snake_case")]
pub enum MatchOutcome {
  NoMatch,
  /// This call inserted the match row.
  MatchCreated(Match),
  /// The row already existed, from an earlier call or a concurrent winner.
  MatchAlreadyExisted(Match),
}

impl MatchOutcome {
  pub fn is_match(&self) -> bool { !matches!(self, Self::NoMatch) }

  pub fn matched(&self) -> Option<&Match> {
    match self {
      Self::NoMatch => None,
      Self::MatchCreated(m) | Self::MatchAlreadyExisted(m) => Some(m),
    }
  }
}

/// A match as seen by one of its parties: the other party's current profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
  pub match_id:   Uuid,
  pub matched_at: DateTime<Utc>,
  pub partner:    Profile,
}
