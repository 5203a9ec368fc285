//! Parsing of chat commands and inline-button payloads.

use std::fmt;

use unimatch_core::profile::Identity;

/// Supported chat commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  Start,
  Help,
  Show,
  Edit,
  Delete,
  Match,
  MyMatches,
  Skip,
  Cancel,
}

/// Parse error for chat command messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
  NotACommand,
  UnknownCommand(String),
}

impl fmt::Display for CommandParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NotACommand => write!(f, "message is not a command"),
      Self::UnknownCommand(cmd) => write!(f, "unknown command `{cmd}`"),
    }
  }
}

impl std::error::Error for CommandParseError {}

/// Parse a chat message into a bot command. A `@botname` suffix is ignored.
pub fn parse_command(text: &str) -> Result<Command, CommandParseError> {
  let Some(raw_command) = text.split_whitespace().next() else {
    return Err(CommandParseError::NotACommand);
  };
  if !raw_command.starts_with('/') {
    return Err(CommandParseError::NotACommand);
  }

  let command = raw_command
    .split_once('@')
    .map_or(raw_command, |(head, _)| head);

  match command.to_ascii_lowercase().as_str() {
    "/start" => Ok(Command::Start),
    "/help" => Ok(Command::Help),
    "/show" => Ok(Command::Show),
    "/edit" => Ok(Command::Edit),
    "/delete" => Ok(Command::Delete),
    "/match" => Ok(Command::Match),
    "/mymatches" => Ok(Command::MyMatches),
    "/skip" => Ok(Command::Skip),
    "/cancel" => Ok(Command::Cancel),
    _ => Err(CommandParseError::UnknownCommand(command.to_string())),
  }
}

/// Help text returned by `/help`.
pub const fn command_help() -> &'static str {
  "Commands\n\n\
  /start - Register, or see what you can do next\n\
  /show - Your profile\n\
  /edit - Change your age, hobby or description\n\
  /delete - Delete your account\n\
  /match - Browse other students\n\
  /mymatches - Everyone you matched with\n\
  /cancel - Abort the current step"
}

/// Bot commands for the Telegram "/" menu, as `(command, description)`.
pub fn bot_commands() -> Vec<(&'static str, &'static str)> {
  vec![
    ("start", "Register or get started"),
    ("show", "Show your profile"),
    ("edit", "Edit your profile"),
    ("delete", "Delete your account"),
    ("match", "Browse profiles"),
    ("mymatches", "List your matches"),
    ("cancel", "Abort the current step"),
    ("help", "Show help"),
  ]
}

// ─── Inline buttons ──────────────────────────────────────────────────────────

/// Payload of an inline button under a candidate card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
  Like(Identity),
  Dislike(Identity),
  Next,
}

/// Telegram rejects inline buttons whose data exceeds this many bytes.
pub const MAX_CALLBACK_LEN: usize = 64;

const LIKE_PREFIX: &str = "like:";
const DISLIKE_PREFIX: &str = "dislike:";
const NEXT: &str = "next";

impl Callback {
  /// Encode as button data. See [`Self::fits`] for the size limit.
  pub fn encode(&self) -> String {
    match self {
      Self::Like(target) => format!("{LIKE_PREFIX}{target}"),
      Self::Dislike(target) => format!("{DISLIKE_PREFIX}{target}"),
      Self::Next => NEXT.to_string(),
    }
  }

  /// Whether the encoded form is short enough to attach to a button.
  pub fn fits(&self) -> bool { self.encode().len() <= MAX_CALLBACK_LEN }

  pub fn parse(data: &str) -> Option<Self> {
    if data == NEXT {
      return Some(Self::Next);
    }
    if let Some(rest) = data.strip_prefix(LIKE_PREFIX) {
      return Identity::new(rest).ok().map(Self::Like);
    }
    if let Some(rest) = data.strip_prefix(DISLIKE_PREFIX) {
      return Identity::new(rest).ok().map(Self::Dislike);
    }
    None
  }
}

impl fmt::Display for Callback {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.encode())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_known_commands() {
    assert_eq!(parse_command("/start"), Ok(Command::Start));
    assert_eq!(parse_command("/mymatches"), Ok(Command::MyMatches));
    assert_eq!(parse_command("/Match"), Ok(Command::Match));
    assert_eq!(parse_command("/cancel now"), Ok(Command::Cancel));
  }

  #[test]
  fn strips_bot_mention() {
    assert_eq!(parse_command("/show@unimatch_bot"), Ok(Command::Show));
  }

  #[test]
  fn rejects_plain_text_and_unknown() {
    assert_eq!(parse_command("hello"), Err(CommandParseError::NotACommand));
    assert_eq!(parse_command("   "), Err(CommandParseError::NotACommand));
    assert_eq!(
      parse_command("/dance"),
      Err(CommandParseError::UnknownCommand("/dance".into()))
    );
  }

  #[test]
  fn help_mentions_every_menu_command() {
    for (cmd, _) in bot_commands() {
      if cmd == "help" {
        continue;
      }
      assert!(command_help().contains(&format!("/{cmd}")), "{cmd} missing");
    }
  }

  #[test]
  fn callbacks_parse_back() {
    let bob = Identity::new("bob").unwrap();
    for cb in [Callback::Like(bob.clone()), Callback::Dislike(bob), Callback::Next] {
      assert_eq!(Callback::parse(&cb.encode()), Some(cb));
    }
  }

  #[test]
  fn long_identities_do_not_fit_a_button() {
    let short = Identity::new("a".repeat(32)).unwrap();
    assert!(Callback::Dislike(short).fits());

    let long = Identity::new("a".repeat(60)).unwrap();
    assert!(Callback::Like(long.clone()).encode().len() > MAX_CALLBACK_LEN);
    assert!(!Callback::Dislike(long).fits());
  }

  #[test]
  fn callback_rejects_garbage() {
    assert_eq!(Callback::parse("superlike:bob"), None);
    assert_eq!(Callback::parse("like:"), None);
    assert_eq!(Callback::parse(""), None);
  }
}
