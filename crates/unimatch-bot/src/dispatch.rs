//! The conversation layer: turns one incoming chat event into the replies to
//! send, advancing the chat's [`Session`] on the way.
//!
//! Nothing here knows about Telegram. The transport converts updates into
//! [`Incoming`] values and delivers the returned [`Reply`] list; the tests
//! drive [`App`] directly.

use tracing::{debug, info, warn};
use unimatch_core::{
  interaction::Action,
  profile::{AGE_RANGE, Gender, Identity, NewProfile, Profile, ProfileUpdate},
  wire::OutcomeKind,
};

use crate::{
  backend::{Backend, BackendError, FailureKind},
  command::{Callback, Command, CommandParseError, command_help, parse_command},
  reply::{self, Body, Markup, Reply, choices},
  session::{ChatKey, ChatRegistry, Draft, EditStep, Question, Session, SessionStore, Step},
};

/// Extra candidate requests allowed beyond the number of skipped profiles
/// before browsing gives up.
const CANDIDATE_ATTEMPTS: usize = 5;

const NO_USERNAME: &str = "Please set a Telegram username in your settings to use unimatch.";
const NOT_REGISTERED: &str = "You are not registered yet. Please use /start to register.";
const NO_MORE_PROFILES: &str = "No more profiles available. Check back later!";
const TRY_LATER: &str = "Something went wrong on our side. Please try again later.";

const EDIT_AGE: &str = "Edit Age";
const EDIT_HOBBY: &str = "Edit Hobby";
const EDIT_DESCRIPTION: &str = "Edit Description";
const EDIT_CANCEL: &str = "Cancel";
const CONFIRM_DELETE: &str = "Yes, delete my account";
const KEEP_ACCOUNT: &str = "No, keep my account";

// ─── Input ───────────────────────────────────────────────────────────────────

/// One update from a chat.
#[derive(Debug, Clone)]
pub struct Incoming {
  pub chat:     ChatKey,
  /// The sender's platform username, if they have one.
  pub username: Option<String>,
  pub event:    Event,
}

#[derive(Debug, Clone)]
pub enum Event {
  Text(String),
  /// A photo, by platform file id.
  Photo(String),
  /// Data of a pressed inline button.
  Callback(String),
}

/// Bot behaviour that is not a matter of deployment plumbing.
#[derive(Debug, Clone)]
pub struct BotConfig {
  /// Registration only accepts email addresses ending in this domain.
  pub email_domain: String,
}

impl Default for BotConfig {
  fn default() -> Self { Self { email_domain: "ntu.edu.sg".to_string() } }
}

// ─── App ─────────────────────────────────────────────────────────────────────

/// Shared state of the running bot.
pub struct App<B> {
  backend:  B,
  sessions: SessionStore,
  chats:    ChatRegistry,
  config:   BotConfig,
}

/// Context of one update, threaded through the handlers.
struct Turn<'a> {
  chat:    ChatKey,
  me:      &'a Identity,
  session: &'a mut Session,
  out:     Vec<Reply>,
}

impl Turn<'_> {
  fn say(&mut self, text: impl Into<String>) { self.out.push(Reply::text(self.chat, text)); }

  fn say_with(&mut self, text: impl Into<String>, markup: Markup) {
    self.out.push(Reply::text_with(self.chat, text, markup));
  }
}

impl<B: Backend> App<B> {
  pub fn new(backend: B, config: BotConfig) -> Self {
    Self {
      backend,
      sessions: SessionStore::new(),
      chats: ChatRegistry::new(),
      config,
    }
  }

  /// Handle one update and return every message to send, in order. Replies
  /// addressed to other chats are match notifications.
  pub async fn handle(&self, incoming: Incoming) -> Vec<Reply> {
    let chat = incoming.chat;
    let Some(me) = incoming
      .username
      .as_deref()
      .and_then(|u| Identity::new(u.trim_start_matches('@')).ok())
    else {
      return vec![Reply::text(chat, NO_USERNAME)];
    };
    self.chats.remember(&me, chat);

    let mut session = self.sessions.take(chat);
    let mut turn = Turn { chat, me: &me, session: &mut session, out: Vec::new() };

    match incoming.event {
      Event::Text(text) => match parse_command(&text) {
        Ok(command) => self.on_command(&mut turn, command).await,
        Err(CommandParseError::NotACommand) => self.on_text(&mut turn, text.trim()).await,
        Err(CommandParseError::UnknownCommand(cmd)) => {
          turn.say(format!("I don't know {cmd}. Try /help."));
        }
      },
      Event::Photo(file_id) => self.on_photo(&mut turn, file_id).await,
      Event::Callback(data) => match Callback::parse(&data) {
        Some(callback) => self.on_callback(&mut turn, callback).await,
        None => debug!(%chat, %data, "ignoring unknown callback"),
      },
    }

    let out = turn.out;
    self.sessions.put(chat, session);
    out
  }

  /// Drop all state kept for a chat, e.g. after the account is deleted.
  fn forget(&self, turn: &mut Turn<'_>) {
    self.chats.forget(turn.me);
    turn.session.seen.clear();
    turn.session.current = None;
    turn.session.reset();
  }

  // ── Commands ──────────────────────────────────────────────────────────

  async fn on_command(&self, turn: &mut Turn<'_>, command: Command) {
    match command {
      Command::Cancel => {
        if turn.session.is_idle() {
          turn.say_with("Nothing to cancel.", Markup::Remove);
        } else {
          turn.session.reset();
          turn.say_with("Cancelled. You can start again anytime.", Markup::Remove);
        }
        return;
      }
      Command::Skip => {
        if let Step::Registering(draft) = &turn.session.step
          && draft.pending() == Question::Photo
        {
          let draft = draft.clone();
          self.finish_registration(turn, draft, None).await;
        } else {
          turn.say("Nothing to skip.");
        }
        return;
      }
      _ => {}
    }

    // Any other command abandons a dialogue in progress.
    turn.session.reset();
    match command {
      Command::Start => self.start(turn).await,
      Command::Help => turn.say(command_help()),
      Command::Show => self.show(turn).await,
      Command::Edit => self.edit_menu(turn).await,
      Command::Delete => self.delete_prompt(turn).await,
      Command::Match => {
        if self.require_profile(turn).await.is_some() {
          turn.session.current = None;
          self.next_candidate(turn).await;
        }
      }
      Command::MyMatches => self.my_matches(turn).await,
      Command::Cancel | Command::Skip => {}
    }
  }

  /// The caller's profile, or `None` after telling them why not.
  async fn require_profile(&self, turn: &mut Turn<'_>) -> Option<Profile> {
    match self.backend.profile(turn.me).await {
      Ok(Some(p)) => Some(p),
      Ok(None) => {
        turn.say(NOT_REGISTERED);
        None
      }
      Err(e) => {
        warn!(identity = %turn.me, error = %e, "profile lookup failed");
        turn.say(TRY_LATER);
        None
      }
    }
  }

  async fn start(&self, turn: &mut Turn<'_>) {
    match self.backend.profile(turn.me).await {
      Ok(Some(p)) => {
        turn.say(format!("Glad to see you back, {}!", p.name));
        turn.say_with(
          "Choose your next action:",
          choices(&[["/edit", "/delete"], ["/match", "/mymatches"]]),
        );
      }
      Ok(None) => {
        turn.session.step = Step::Registering(Draft::default());
        turn.say("Hi there!\nIt seems you're new here. Please register to continue.");
        turn.say(format!(
          "Please enter your email address (ending with {}):",
          self.config.email_domain
        ));
      }
      Err(e) => {
        warn!(identity = %turn.me, error = %e, "profile lookup failed");
        turn.say(TRY_LATER);
      }
    }
  }

  async fn show(&self, turn: &mut Turn<'_>) {
    let Some(p) = self.require_profile(turn).await else { return };
    let caption = reply::own_profile(&p);
    match p.picture_id {
      Some(file_id) => turn.out.push(Reply {
        chat: turn.chat,
        body: Body::Photo { file_id, caption, markup: Markup::Keep },
      }),
      None => turn.say(caption),
    }
  }

  async fn my_matches(&self, turn: &mut Turn<'_>) {
    if self.require_profile(turn).await.is_none() {
      return;
    }
    let matches = match self.backend.matches(turn.me).await {
      Ok(m) => m,
      Err(e) => {
        warn!(identity = %turn.me, error = %e, "listing matches failed");
        turn.say("We couldn't retrieve your matches right now. Please try again later.");
        return;
      }
    };
    if matches.is_empty() {
      turn.say("You have no matches yet. Keep exploring profiles with /match!");
      return;
    }

    let mut text = String::from("Here are your matches:");
    for m in &matches {
      text.push('\n');
      text.push_str(&reply::match_line(m));
    }
    turn.say(text);
  }

  // ── Free text ─────────────────────────────────────────────────────────

  async fn on_text(&self, turn: &mut Turn<'_>, text: &str) {
    match turn.session.step.clone() {
      Step::Idle => turn.say("Not sure what you mean. Try /help."),
      Step::Registering(draft) => self.register_answer(turn, draft, text).await,
      Step::Editing(step) => self.edit_answer(turn, step, text).await,
      Step::ConfirmDelete => self.delete_answer(turn, text).await,
    }
  }

  async fn on_photo(&self, turn: &mut Turn<'_>, file_id: String) {
    match &turn.session.step {
      Step::Registering(draft) if draft.pending() == Question::Photo => {
        let draft = draft.clone();
        self.finish_registration(turn, draft, Some(file_id)).await;
      }
      _ => turn.say("Nice photo! Photos are only used while registering."),
    }
  }

  // ── Registration ──────────────────────────────────────────────────────

  async fn register_answer(&self, turn: &mut Turn<'_>, mut draft: Draft, text: &str) {
    match draft.pending() {
      Question::Email => {
        if !self.accepts_email(text) {
          turn.say(format!(
            "Please enter a valid email address (ending with {}):",
            self.config.email_domain
          ));
          return;
        }
        draft.email = Some(text.to_string());
        turn.say("Great! Now, what's your full name?");
      }
      Question::Name => {
        if text.is_empty() {
          turn.say("Please enter your name:");
          return;
        }
        draft.name = Some(text.to_string());
        turn.say("Nice to meet you! How old are you?");
      }
      Question::Age => {
        let Some(age) = parse_age(turn, text) else { return };
        draft.age = Some(age);
        turn.say_with("What's your gender?", gender_choices());
      }
      Question::Gender => {
        let Ok(gender) = text.parse::<Gender>() else {
          turn.say_with("Please choose one of the options:", gender_choices());
          return;
        };
        draft.gender = Some(gender);
        turn.say_with(
          "Almost done! Tell me about your hobbies or interests:",
          Markup::Remove,
        );
      }
      Question::Hobby => {
        draft.hobby = Some(text.to_string());
        turn.say("Great! Now, please provide a brief description about yourself:");
      }
      Question::Description => {
        draft.description = Some(text.to_string());
        turn.say("Last step: send a profile photo, or /skip to finish without one.");
      }
      Question::Photo => {
        turn.say("Please send a photo, or /skip.");
      }
    }
    turn.session.step = Step::Registering(draft);
  }

  fn accepts_email(&self, email: &str) -> bool {
    let domain = self.config.email_domain.to_ascii_lowercase();
    email.contains('@')
      && !email.chars().any(char::is_whitespace)
      && email.to_ascii_lowercase().ends_with(&domain)
  }

  async fn finish_registration(
    &self,
    turn: &mut Turn<'_>,
    draft: Draft,
    picture_id: Option<String>,
  ) {
    turn.session.reset();

    let (Some(email), Some(name), Some(age), Some(gender)) =
      (draft.email, draft.name, draft.age, draft.gender)
    else {
      turn.say("Registration was incomplete. Please start again with /start.");
      return;
    };
    let input = NewProfile {
      identity: turn.me.clone(),
      email,
      name,
      age,
      gender,
      hobby: draft.hobby.unwrap_or_default(),
      description: draft.description.unwrap_or_default(),
      picture_id,
    };

    match self.backend.register(input).await {
      Ok(p) => {
        info!(identity = %p.identity, "registered via chat");
        turn.say(format!(
          "Registration successful!\n\nWelcome to unimatch, {}!\n\
           Your profile has been created. Start matching with other students with /match!",
          p.name
        ));
      }
      Err(BackendError::Rejected { kind: FailureKind::Conflict, .. }) => {
        turn.say("Registration failed: this username or email is already registered.");
      }
      Err(BackendError::Rejected { kind: FailureKind::Validation, message }) => {
        turn.say(format!("Registration failed: {message}. Please try again with /start."));
      }
      Err(e) => {
        warn!(identity = %turn.me, error = %e, "registration failed");
        turn.say("Registration failed. Please try again later.");
      }
    }
  }

  // ── Editing ───────────────────────────────────────────────────────────

  async fn edit_menu(&self, turn: &mut Turn<'_>) {
    if self.require_profile(turn).await.is_none() {
      return;
    }
    turn.session.step = Step::Editing(EditStep::Choose);
    turn.say_with(
      "What would you like to edit?",
      choices(&[[EDIT_AGE, EDIT_HOBBY], [EDIT_DESCRIPTION, EDIT_CANCEL]]),
    );
  }

  async fn edit_answer(&self, turn: &mut Turn<'_>, step: EditStep, text: &str) {
    match step {
      EditStep::Choose => {
        let (next, prompt) = match text {
          EDIT_AGE => (EditStep::Age, "Please enter your new age:"),
          EDIT_HOBBY => (EditStep::Hobby, "Please enter your new hobby:"),
          EDIT_DESCRIPTION => (EditStep::Description, "Please enter your new description:"),
          EDIT_CANCEL => {
            turn.session.reset();
            turn.say_with("Edit cancelled.", Markup::Remove);
            return;
          }
          _ => {
            turn.say("Invalid selection. Please choose again.");
            return;
          }
        };
        turn.session.step = Step::Editing(next);
        turn.say_with(prompt, Markup::Remove);
      }
      EditStep::Age => {
        let Some(age) = parse_age(turn, text) else { return };
        self
          .apply_edit(turn, format!("Your age has been updated to {age}."), |u| u.age = age)
          .await;
      }
      EditStep::Hobby => {
        let hobby = text.to_string();
        self
          .apply_edit(turn, "Your hobby has been updated.".into(), |u| u.hobby = hobby)
          .await;
      }
      EditStep::Description => {
        let description = text.to_string();
        self
          .apply_edit(turn, "Your description has been updated.".into(), |u| {
            u.description = description
          })
          .await;
      }
    }
  }

  /// Re-read the profile, change one field, write every field back, then
  /// offer the edit menu again.
  async fn apply_edit(
    &self,
    turn: &mut Turn<'_>,
    done: String,
    change: impl FnOnce(&mut ProfileUpdate),
  ) {
    let Some(current) = self.require_profile(turn).await else {
      turn.session.reset();
      return;
    };
    let mut update = ProfileUpdate::from(&current);
    update.is_active = None;
    change(&mut update);

    match self.backend.update(turn.me, update).await {
      Ok(_) => turn.say(done),
      Err(BackendError::Rejected { kind: FailureKind::Validation, message }) => {
        turn.say(format!("That didn't work: {message}"));
      }
      Err(e) => {
        warn!(identity = %turn.me, error = %e, "profile update failed");
        turn.say("Failed to update your profile. Please try again later.");
      }
    }

    turn.session.step = Step::Editing(EditStep::Choose);
    turn.say_with(
      "What else would you like to edit?",
      choices(&[[EDIT_AGE, EDIT_HOBBY], [EDIT_DESCRIPTION, EDIT_CANCEL]]),
    );
  }

  // ── Deletion ──────────────────────────────────────────────────────────

  async fn delete_prompt(&self, turn: &mut Turn<'_>) {
    if self.require_profile(turn).await.is_none() {
      return;
    }
    turn.session.step = Step::ConfirmDelete;
    turn.say_with(
      "Are you sure you want to delete your account? This action cannot be undone.",
      choices(&[[CONFIRM_DELETE], [KEEP_ACCOUNT]]),
    );
  }

  async fn delete_answer(&self, turn: &mut Turn<'_>, text: &str) {
    match text {
      CONFIRM_DELETE => {
        turn.session.reset();
        match self.backend.delete(turn.me).await {
          Ok(()) => {
            info!(identity = %turn.me, "account deleted via chat");
            self.forget(turn);
            turn.say_with("Your account has been deleted successfully.", Markup::Remove);
          }
          Err(e) if e.is_not_found() => {
            turn.say_with(NOT_REGISTERED, Markup::Remove);
          }
          Err(e) => {
            warn!(identity = %turn.me, error = %e, "account deletion failed");
            turn.say_with(
              "There was an error deleting your account. Please try again later.",
              Markup::Remove,
            );
          }
        }
      }
      KEEP_ACCOUNT => {
        turn.session.reset();
        turn.say_with("Account deletion cancelled.", Markup::Remove);
      }
      _ => turn.say("Invalid selection. Please choose again."),
    }
  }

  // ── Browsing ──────────────────────────────────────────────────────────

  async fn on_callback(&self, turn: &mut Turn<'_>, callback: Callback) {
    match callback {
      Callback::Like(target) => {
        turn.session.seen.insert(target.clone());
        match self.backend.act(turn.me, &target, Action::Like).await {
          Ok(resp) => {
            if resp.is_match {
              turn.say(format!("🎉 It's a match!\nYou and @{target} liked each other!"));
            }
            if resp.outcome == OutcomeKind::MatchCreated {
              self.notify_partner(turn, &target);
            }
          }
          Err(e) => self.report_action_failure(turn, &target, &e),
        }
      }
      Callback::Dislike(target) => {
        turn.session.seen.insert(target.clone());
        if let Err(e) = self.backend.act(turn.me, &target, Action::Dislike).await {
          self.report_action_failure(turn, &target, &e);
        }
      }
      Callback::Next => {
        if let Some(current) = turn.session.current.take() {
          turn.session.seen.insert(current);
        }
      }
    }
    self.next_candidate(turn).await;
  }

  fn report_action_failure(&self, turn: &mut Turn<'_>, target: &Identity, e: &BackendError) {
    match e {
      BackendError::Rejected { kind: FailureKind::NotFound | FailureKind::Validation, message } => {
        turn.say(format!("⚠️ {message}"));
      }
      e => {
        warn!(actor = %turn.me, %target, error = %e, "recording action failed");
        turn.say("We couldn't record that. Please try again later.");
      }
    }
  }

  /// Tell the other party of a new match, if they have talked to the bot.
  fn notify_partner(&self, turn: &mut Turn<'_>, partner: &Identity) {
    match self.chats.chat_of(partner) {
      Some(chat) => turn.out.push(Reply::text(
        chat,
        format!("🎉 It's a match!\nYou and @{} liked each other!", turn.me),
      )),
      None => debug!(%partner, "partner chat unknown, match notification skipped"),
    }
  }

  /// Show one more candidate the caller has not skipped yet.
  async fn next_candidate(&self, turn: &mut Turn<'_>) {
    let attempts = turn.session.seen.len() + CANDIDATE_ATTEMPTS;
    for _ in 0..attempts {
      let candidate = match self.backend.candidate(turn.me).await {
        Ok(Some(p)) => p,
        Ok(None) => break,
        Err(e) => {
          warn!(identity = %turn.me, error = %e, "candidate lookup failed");
          turn.session.current = None;
          turn.say("We couldn't load a profile right now. Please try again soon.");
          return;
        }
      };
      if &candidate.identity == turn.me || turn.session.seen.contains(&candidate.identity) {
        continue;
      }
      // The longest button payload is the dislike one.
      if !Callback::Dislike(candidate.identity.clone()).fits() {
        debug!(candidate = %candidate.identity, "identity too long for buttons, skipping");
        turn.session.seen.insert(candidate.identity);
        continue;
      }

      turn.session.current = Some(candidate.identity.clone());
      let caption = reply::candidate_card(&candidate);
      let markup = reply::candidate_buttons(&candidate);
      let body = match candidate.picture_id {
        Some(file_id) => Body::Photo { file_id, caption, markup },
        None => Body::Text { text: caption, markup },
      };
      turn.out.push(Reply { chat: turn.chat, body });
      return;
    }

    turn.session.current = None;
    turn.say(NO_MORE_PROFILES);
  }
}

fn gender_choices() -> Markup { choices(&[["Male", "Female", "Other"]]) }

/// Parse an age answer, replying with the problem if it is not acceptable.
fn parse_age(turn: &mut Turn<'_>, text: &str) -> Option<u8> {
  let Ok(age) = text.parse::<u8>() else {
    turn.say("Please enter a valid number for your age:");
    return None;
  };
  if !AGE_RANGE.contains(&age) {
    turn.say(format!(
      "Please enter a valid age ({}-{}):",
      AGE_RANGE.start(),
      AGE_RANGE.end()
    ));
    return None;
  }
  Some(age)
}
