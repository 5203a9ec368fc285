//! `unimatch-bot` — Telegram front end for the unimatch API.
//!
//! # Usage
//!
//! ```
//! unimatch-bot --url http://localhost:8000 --user bot --password secret --token 123:abc
//! unimatch-bot --config ~/.config/unimatch/bot.toml
//! ```

mod backend;
mod client;
mod command;
mod dispatch;
mod reply;
mod session;
mod telegram;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use client::{ApiClient, ApiConfig};
use dispatch::{App, BotConfig};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "unimatch-bot", version, about = "Telegram bot for unimatch")]
struct Args {
  /// Path to a TOML config file (url, username, password, token, email_domain).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the unimatch server (default: http://localhost:8000).
  #[arg(long, env = "UNIMATCH_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "UNIMATCH_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "UNIMATCH_PASSWORD", hide_env_values = true)]
  password: Option<String>,

  /// Bot API token obtained from BotFather.
  #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
  token: Option<String>,

  /// Registration only accepts emails ending in this domain (default: ntu.edu.sg).
  #[arg(long, env = "UNIMATCH_EMAIL_DOMAIN")]
  email_domain: Option<String>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:          String,
  #[serde(default)]
  username:     String,
  #[serde(default)]
  password:     String,
  #[serde(default)]
  token:        String,
  #[serde(default)]
  email_domain: String,
}

/// A flag or environment value, else a non-empty file value.
fn pick(arg: Option<String>, file: &str) -> Option<String> {
  arg.or_else(|| (!file.is_empty()).then(|| file.to_string()))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags and env override the config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: pick(args.url, &file_cfg.url)
      .unwrap_or_else(|| "http://localhost:8000".to_string()),
    username: pick(args.user, &file_cfg.username).unwrap_or_default(),
    password: pick(args.password, &file_cfg.password).unwrap_or_default(),
  };
  let token = pick(args.token, &file_cfg.token)
    .context("no bot token: pass --token or set TELEGRAM_BOT_TOKEN")?;
  let bot_config = BotConfig {
    email_domain: pick(args.email_domain, &file_cfg.email_domain)
      .unwrap_or_else(|| BotConfig::default().email_domain),
  };

  tracing::info!(api = %api_config.base_url, domain = %bot_config.email_domain, "starting bot");
  let client = ApiClient::new(api_config)?;
  let app = Arc::new(App::new(client, bot_config));

  telegram::run(&token, app).await;
  Ok(())
}
