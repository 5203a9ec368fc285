//! Interactions — the latest directional action from one profile to another.
//!
//! The ledger keeps exactly one record per ordered `(actor, target)` pair.
//! Re-submitting an action overwrites the previous one; no history is kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, profile::Identity};

/// A swipe decision.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Action {
  Like,
  Dislike,
}

impl Action {
  /// Parse a client-supplied action name, case-insensitively.
  pub fn parse(raw: &str) -> Result<Self> {
    raw
      .trim()
      .parse()
      .map_err(|_| Error::Validation(format!("invalid action: {raw:?}")))
  }

  pub fn is_like(self) -> bool { matches!(self, Self::Like) }
}

/// The post-write state of a ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
  pub actor:      Identity,
  pub target:     Identity,
  pub action:     Action,
  /// Time of the most recent submission for this ordered pair.
  pub updated_at: DateTime<Utc>,
}
