//! Per-chat conversation state.
//!
//! Every chat gets a [`Session`] on first contact. Multi-step dialogues
//! (registration, editing, deletion) advance its [`Step`]; finishing a
//! dialogue or sending `/cancel` puts it back to [`Step::Idle`]. Browsing
//! state lives beside the step so that a dialogue does not forget which
//! profiles were already skipped.

use std::collections::HashSet;

use dashmap::DashMap;
use unimatch_core::profile::{Gender, Identity};

/// Telegram chat id.
pub type ChatKey = i64;

// ─── Dialogue steps ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Step {
  #[default]
  Idle,
  Registering(Draft),
  Editing(EditStep),
  ConfirmDelete,
}

/// Registration answers collected so far, in the order they are asked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
  pub email:       Option<String>,
  pub name:        Option<String>,
  pub age:         Option<u8>,
  pub gender:      Option<Gender>,
  pub hobby:       Option<String>,
  pub description: Option<String>,
}

/// The question a [`Draft`] is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Question {
  Email,
  Name,
  Age,
  Gender,
  Hobby,
  Description,
  Photo,
}

impl Draft {
  /// First unanswered question; the photo always comes last.
  pub fn pending(&self) -> Question {
    if self.email.is_none() {
      Question::Email
    } else if self.name.is_none() {
      Question::Name
    } else if self.age.is_none() {
      Question::Age
    } else if self.gender.is_none() {
      Question::Gender
    } else if self.hobby.is_none() {
      Question::Hobby
    } else if self.description.is_none() {
      Question::Description
    } else {
      Question::Photo
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStep {
  Choose,
  Age,
  Hobby,
  Description,
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Session {
  pub step:    Step,
  /// Profiles passed over in `/match`, never offered again in this session.
  pub seen:    HashSet<Identity>,
  /// The profile currently on screen, skipped by the "next" button.
  pub current: Option<Identity>,
}

impl Session {
  pub fn reset(&mut self) { self.step = Step::Idle; }

  pub fn is_idle(&self) -> bool { self.step == Step::Idle }
}

/// Sessions keyed by chat.
///
/// Updates from one chat are handled one at a time, so a handler takes the
/// session out, works on it, and puts it back.
#[derive(Default)]
pub struct SessionStore {
  sessions: DashMap<ChatKey, Session>,
}

impl SessionStore {
  pub fn new() -> Self { Self::default() }

  /// Remove and return the session for `chat`, or a fresh one.
  pub fn take(&self, chat: ChatKey) -> Session {
    self
      .sessions
      .remove(&chat)
      .map(|(_, s)| s)
      .unwrap_or_default()
  }

  pub fn put(&self, chat: ChatKey, session: Session) {
    self.sessions.insert(chat, session);
  }
}

/// Last known chat of every identity that has talked to the bot; used to
/// tell a partner about a new match.
#[derive(Default)]
pub struct ChatRegistry {
  chats: DashMap<Identity, ChatKey>,
}

impl ChatRegistry {
  pub fn new() -> Self { Self::default() }

  pub fn remember(&self, identity: &Identity, chat: ChatKey) {
    self.chats.insert(identity.clone(), chat);
  }

  pub fn chat_of(&self, identity: &Identity) -> Option<ChatKey> {
    self.chats.get(identity).map(|c| *c)
  }

  pub fn forget(&self, identity: &Identity) { self.chats.remove(identity); }
}
