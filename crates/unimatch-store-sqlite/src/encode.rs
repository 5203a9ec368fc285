//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that `ORDER BY created_at` on the text column is chronological.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use unimatch_core::{
  interaction::{Action, Interaction},
  matching::Match,
  profile::{Gender, Identity, Profile},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store keeps, so a record built in
/// memory equals the same record read back.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_action(s: &str) -> Result<Action> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown action: {s:?}")))
}

pub fn decode_gender(s: &str) -> Result<Gender> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown gender: {s:?}")))
}

pub fn decode_identity(s: String) -> Result<Identity> { Ok(Identity::new(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawProfile::from_row`].
pub const PROFILE_COLUMNS: &str = "identity, email, name, age, gender, hobby, \
                                   description, picture_id, is_active, created_at";

/// Raw values read directly from a `profiles` row.
pub struct RawProfile {
  pub identity:    String,
  pub email:       String,
  pub name:        String,
  pub age:         i64,
  pub gender:      String,
  pub hobby:       String,
  pub description: String,
  pub picture_id:  Option<String>,
  pub is_active:   bool,
  pub created_at:  String,
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identity:    row.get(0)?,
      email:       row.get(1)?,
      name:        row.get(2)?,
      age:         row.get(3)?,
      gender:      row.get(4)?,
      hobby:       row.get(5)?,
      description: row.get(6)?,
      picture_id:  row.get(7)?,
      is_active:   row.get(8)?,
      created_at:  row.get(9)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    let age = u8::try_from(self.age)
      .map_err(|_| Error::Decode(format!("age out of range: {}", self.age)))?;
    Ok(Profile {
      identity: decode_identity(self.identity)?,
      email: self.email,
      name: self.name,
      age,
      gender: decode_gender(&self.gender)?,
      hobby: self.hobby,
      description: self.description,
      picture_id: self.picture_id,
      is_active: self.is_active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from an `interactions` row.
pub struct RawInteraction {
  pub actor:      String,
  pub target:     String,
  pub action:     String,
  pub updated_at: String,
}

impl RawInteraction {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      actor:      row.get(0)?,
      target:     row.get(1)?,
      action:     row.get(2)?,
      updated_at: row.get(3)?,
    })
  }

  pub fn into_interaction(self) -> Result<Interaction> {
    Ok(Interaction {
      actor:      decode_identity(self.actor)?,
      target:     decode_identity(self.target)?,
      action:     decode_action(&self.action)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `matches` row.
pub struct RawMatch {
  pub match_id:   String,
  pub first:      String,
  pub second:     String,
  pub created_at: String,
}

impl RawMatch {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      match_id:   row.get(0)?,
      first:      row.get(1)?,
      second:     row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_match(self) -> Result<Match> {
    Ok(Match {
      match_id:   decode_uuid(&self.match_id)?,
      first:      decode_identity(self.first)?,
      second:     decode_identity(self.second)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
