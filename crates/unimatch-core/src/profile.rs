//! Profiles — the registry records that interactions and matches point at.
//!
//! A profile is keyed by its [`Identity`], the chat-platform username of its
//! owner. The identity never changes once registered; every other field can
//! be replaced through a [`ProfileUpdate`].

use std::{fmt, ops::RangeInclusive};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

/// Ages accepted at registration and on edit.
pub const AGE_RANGE: RangeInclusive<u8> = 16..=30;

const MAX_IDENTITY_LEN: usize = 64;

// ─── Identity ────────────────────────────────────────────────────────────────

/// A stable, unique handle for a profile owner.
///
/// Identities are totally ordered by their UTF-8 bytes; that order is what
/// gives every match its canonical orientation.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
  pub fn new(raw: impl Into<String>) -> Result<Self> {
    let raw = raw.into();
    if raw.is_empty() {
      return Err(Error::validation("identity must not be empty"));
    }
    if raw.len() > MAX_IDENTITY_LEN {
      return Err(Error::validation(format!(
        "identity must be at most {MAX_IDENTITY_LEN} bytes"
      )));
    }
    if raw.chars().any(char::is_whitespace) {
      return Err(Error::validation("identity must not contain whitespace"));
    }
    Ok(Self(raw))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Identity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for Identity {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<Identity> for String {
  fn from(value: Identity) -> Self { value.0 }
}

impl AsRef<str> for Identity {
  fn as_ref(&self) -> &str { &self.0 }
}

// ─── Gender ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Gender {
  Male,
  Female,
  Other,
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// A registered user as stored by the profile store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub identity:    Identity,
  pub email:       String,
  pub name:        String,
  pub age:         u8,
  pub gender:      Gender,
  pub hobby:       String,
  pub description: String,
  /// Opaque reference to a picture held by the chat platform.
  pub picture_id:  Option<String>,
  /// Inactive profiles are never offered as candidates.
  pub is_active:   bool,
  /// Server-assigned; never changes after registration.
  pub created_at:  DateTime<Utc>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::MatchStore::create_profile`].
/// `created_at` is always set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
  pub identity:    Identity,
  pub email:       String,
  pub name:        String,
  pub age:         u8,
  pub gender:      Gender,
  #[serde(default)]
  pub hobby:       String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub picture_id:  Option<String>,
}

impl NewProfile {
  /// Check every field that the type system does not already guarantee.
  pub fn validate(&self) -> Result<()> {
    validate_fields(&self.email, &self.name, self.age)
  }
}

/// Replacement values for every mutable profile field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdate {
  pub email:       String,
  pub name:        String,
  pub age:         u8,
  pub gender:      Gender,
  #[serde(default)]
  pub hobby:       String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub picture_id:  Option<String>,
  /// Left unchanged when absent.
  #[serde(default)]
  pub is_active:   Option<bool>,
}

impl ProfileUpdate {
  pub fn validate(&self) -> Result<()> {
    validate_fields(&self.email, &self.name, self.age)
  }
}

impl From<&Profile> for ProfileUpdate {
  /// Start an edit from the current state of a profile.
  fn from(p: &Profile) -> Self {
    Self {
      email:       p.email.clone(),
      name:        p.name.clone(),
      age:         p.age,
      gender:      p.gender,
      hobby:       p.hobby.clone(),
      description: p.description.clone(),
      picture_id:  p.picture_id.clone(),
      is_active:   Some(p.is_active),
    }
  }
}

fn validate_fields(email: &str, name: &str, age: u8) -> Result<()> {
  if email.trim().is_empty() || !email.contains('@') {
    return Err(Error::validation(format!("invalid email address: {email:?}")));
  }
  if name.trim().is_empty() {
    return Err(Error::validation("name must not be empty"));
  }
  if !AGE_RANGE.contains(&age) {
    return Err(Error::validation(format!(
      "age must be between {} and {}",
      AGE_RANGE.start(),
      AGE_RANGE.end()
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_profile() -> NewProfile {
    NewProfile {
      identity:    Identity::new("alice").unwrap(),
      email:       "alice@e.ntu.edu.sg".into(),
      name:        "Alice".into(),
      age:         21,
      gender:      Gender::Female,
      hobby:       String::new(),
      description: String::new(),
      picture_id:  None,
    }
  }

  #[test]
  fn identity_rejects_empty_and_whitespace() {
    assert!(Identity::new("").is_err());
    assert!(Identity::new("two words").is_err());
    assert!(Identity::new("x".repeat(65)).is_err());
    assert_eq!(Identity::new("bob_99").unwrap().as_str(), "bob_99");
  }

  #[test]
  fn identity_deserialisation_validates() {
    let ok: Identity = serde_json::from_str("\"carol\"").unwrap();
    assert_eq!(ok.as_str(), "carol");
    assert!(serde_json::from_str::<Identity>("\"\"").is_err());
  }

  #[test]
  fn gender_parses_case_insensitively() {
    assert_eq!("Male".parse::<Gender>().unwrap(), Gender::Male);
    assert_eq!("FEMALE".parse::<Gender>().unwrap(), Gender::Female);
    assert_eq!(Gender::Other.to_string(), "other");
    assert!("unknown".parse::<Gender>().is_err());
  }

  #[test]
  fn age_outside_range_is_rejected() {
    let mut p = new_profile();
    p.age = 15;
    assert!(matches!(p.validate(), Err(Error::Validation(_))));
    p.age = 31;
    assert!(matches!(p.validate(), Err(Error::Validation(_))));
    p.age = 30;
    assert!(p.validate().is_ok());
  }

  #[test]
  fn blank_name_and_bad_email_are_rejected() {
    let mut p = new_profile();
    p.name = "   ".into();
    assert!(p.validate().is_err());

    let mut p = new_profile();
    p.email = "not-an-email".into();
    assert!(p.validate().is_err());
  }
}
