//! Transport-agnostic messages produced by the dispatcher.

use unimatch_core::{matching::MatchView, profile::Profile};

use crate::{command::Callback, session::ChatKey};

/// Keyboard attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Markup {
  /// Leave whatever keyboard the client shows.
  #[default]
  Keep,
  /// One-time reply keyboard; pressing a key sends its label as text.
  Choices(Vec<Vec<String>>),
  /// Hide a previously shown reply keyboard.
  Remove,
  /// Inline buttons under the message.
  Buttons(Vec<Vec<Button>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
  pub label:    String,
  pub callback: Callback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
  Text { text: String, markup: Markup },
  Photo { file_id: String, caption: String, markup: Markup },
}

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
  pub chat: ChatKey,
  pub body: Body,
}

impl Reply {
  pub fn text(chat: ChatKey, text: impl Into<String>) -> Self {
    Self::text_with(chat, text, Markup::Keep)
  }

  pub fn text_with(chat: ChatKey, text: impl Into<String>, markup: Markup) -> Self {
    Self { chat, body: Body::Text { text: text.into(), markup } }
  }

  /// The visible text, or the caption of a photo.
  pub fn content(&self) -> &str {
    match &self.body {
      Body::Text { text, .. } => text,
      Body::Photo { caption, .. } => caption,
    }
  }
}

pub fn choices<const N: usize>(rows: &[[&str; N]]) -> Markup {
  Markup::Choices(
    rows
      .iter()
      .map(|row| row.iter().map(|s| (*s).to_string()).collect())
      .collect(),
  )
}

// ─── Formatting ──────────────────────────────────────────────────────────────

/// The owner's own profile, as shown by `/show`.
pub fn own_profile(p: &Profile) -> String {
  format!(
    "{}, {}\nHobbies: {}\nAbout me: {}",
    p.name,
    p.age,
    or_na(&p.hobby),
    or_na(&p.description)
  )
}

/// A candidate card shown while browsing.
pub fn candidate_card(p: &Profile) -> String {
  format!(
    "Name: {}, Age: {}\nGender: {}\nHobbies: {}\nAbout: {}",
    p.name,
    p.age,
    p.gender,
    or_na(&p.hobby),
    or_na(&p.description)
  )
}

/// Like / dislike / next buttons for a candidate card.
pub fn candidate_buttons(p: &Profile) -> Markup {
  let button = |label: &str, callback| Button { label: label.to_string(), callback };
  Markup::Buttons(vec![
    vec![
      button("🩵", Callback::Like(p.identity.clone())),
      button("👎🏻", Callback::Dislike(p.identity.clone())),
    ],
    vec![button("➡️ Next", Callback::Next)],
  ])
}

/// One line of `/mymatches`.
pub fn match_line(m: &MatchView) -> String {
  format!(
    "• @{} - Matched on {}",
    m.partner.identity,
    m.matched_at.format("%d %b %Y")
  )
}

fn or_na(s: &str) -> &str {
  if s.trim().is_empty() { "N/A" } else { s }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};
  use unimatch_core::profile::{Gender, Identity};
  use uuid::Uuid;

  fn profile() -> Profile {
    Profile {
      identity:    Identity::new("bob").unwrap(),
      email:       "bob@e.ntu.edu.sg".into(),
      name:        "Bob".into(),
      age:         22,
      gender:      Gender::Male,
      hobby:       "chess".into(),
      description: String::new(),
      picture_id:  None,
      is_active:   true,
      created_at:  Utc::now(),
    }
  }

  #[test]
  fn card_fills_blanks() {
    let card = candidate_card(&profile());
    assert_eq!(
      card,
      "Name: Bob, Age: 22\nGender: male\nHobbies: chess\nAbout: N/A"
    );
  }

  #[test]
  fn match_line_uses_day_month_year() {
    let view = MatchView {
      match_id:   Uuid::new_v4(),
      matched_at: Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap(),
      partner:    profile(),
    };
    assert_eq!(match_line(&view), "• @bob - Matched on 07 Mar 2025");
  }

  #[test]
  fn buttons_carry_target() {
    let Markup::Buttons(rows) = candidate_buttons(&profile()) else {
      panic!("expected inline buttons");
    };
    assert_eq!(rows[0][0].callback.encode(), "like:bob");
    assert_eq!(rows[0][1].callback.encode(), "dislike:bob");
    assert_eq!(rows[1][0].callback, Callback::Next);
  }
}
