//! Telegram transport: turns updates into [`Incoming`] events and delivers
//! the dispatcher's replies.

use std::sync::Arc;

use teloxide::{
  prelude::*,
  types::{
    BotCommand, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton,
    KeyboardMarkup, KeyboardRemove, ReplyMarkup,
  },
};
use tracing::{debug, info, warn};

use crate::{
  backend::Backend,
  command::bot_commands,
  dispatch::{App, Event, Incoming},
  reply::{Body, Markup, Reply},
};

/// Poll Telegram for updates until interrupted.
pub async fn run<B>(token: &str, app: Arc<App<B>>)
where
  B: Backend + 'static,
{
  let bot = Bot::new(token);

  // Register commands with Telegram so they appear in the "/" menu
  if let Err(e) = register_bot_commands(&bot).await {
    warn!(error = %e, "Failed to register bot commands with Telegram");
  }

  let handler = dptree::entry()
    .branch(Update::filter_message().endpoint(on_message::<B>))
    .branch(Update::filter_callback_query().endpoint(on_callback::<B>));

  info!("Telegram bot started");
  Dispatcher::builder(bot, handler)
    .dependencies(dptree::deps![app])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
  info!("Telegram bot stopped");
}

async fn on_message<B>(bot: Bot, msg: Message, app: Arc<App<B>>) -> ResponseResult<()>
where
  B: Backend + 'static,
{
  let event = if let Some(text) = msg.text() {
    Event::Text(text.to_string())
  } else if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
    Event::Photo(largest.file.id.clone())
  } else {
    debug!(chat = %msg.chat.id, "ignoring message without text or photo");
    return Ok(());
  };

  let incoming = Incoming {
    chat: msg.chat.id.0,
    username: msg.from.as_ref().and_then(|u| u.username.clone()),
    event,
  };
  deliver(&bot, app.handle(incoming).await).await;
  Ok(())
}

async fn on_callback<B>(bot: Bot, q: CallbackQuery, app: Arc<App<B>>) -> ResponseResult<()>
where
  B: Backend + 'static,
{
  bot.answer_callback_query(q.id.clone()).await?;

  // Buttons are single-use: strip them from the card that was pressed.
  if let Some(msg) = q.regular_message()
    && let Err(e) = bot.edit_message_reply_markup(msg.chat.id, msg.id).await
  {
    debug!(error = %e, "could not clear inline keyboard");
  }

  let Some(data) = q.data.clone() else { return Ok(()) };
  let incoming = Incoming {
    chat: ChatId::from(q.from.id).0,
    username: q.from.username.clone(),
    event: Event::Callback(data),
  };
  deliver(&bot, app.handle(incoming).await).await;
  Ok(())
}

/// Send every reply in order. Failures are logged, never retried.
async fn deliver(bot: &Bot, replies: Vec<Reply>) {
  for reply in replies {
    debug!(chat = reply.chat, text = reply.content(), "sending reply");
    let chat = ChatId(reply.chat);
    let sent = match reply.body {
      Body::Text { text, markup } => match reply_markup(markup) {
        Some(m) => bot.send_message(chat, text).reply_markup(m).await,
        None => bot.send_message(chat, text).await,
      },
      Body::Photo { file_id, caption, markup } => {
        let photo = bot
          .send_photo(chat, InputFile::file_id(file_id))
          .caption(caption);
        match reply_markup(markup) {
          Some(m) => photo.reply_markup(m).await,
          None => photo.await,
        }
      }
    };
    if let Err(e) = sent {
      warn!(chat = reply.chat, error = %e, "Failed to send Telegram message");
    }
  }
}

fn reply_markup(markup: Markup) -> Option<ReplyMarkup> {
  match markup {
    Markup::Keep => None,
    Markup::Remove => Some(KeyboardRemove::new().into()),
    Markup::Choices(rows) => {
      let keyboard = rows
        .into_iter()
        .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>())
        .collect::<Vec<_>>();
      Some(
        KeyboardMarkup::new(keyboard)
          .resize_keyboard()
          .one_time_keyboard()
          .into(),
      )
    }
    Markup::Buttons(rows) => {
      let keyboard = rows.into_iter().map(|row| {
        row
          .into_iter()
          .map(|b| InlineKeyboardButton::callback(b.label, b.callback.encode()))
          .collect::<Vec<_>>()
      });
      Some(InlineKeyboardMarkup::new(keyboard).into())
    }
  }
}

/// Register bot commands with Telegram for the "/" menu.
async fn register_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
  let commands: Vec<BotCommand> = bot_commands()
    .into_iter()
    .map(|(cmd, desc)| BotCommand::new(cmd, desc))
    .collect();

  bot.set_my_commands(commands).await?;
  info!("Registered bot commands with Telegram");
  Ok(())
}
