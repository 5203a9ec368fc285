//! unimatch server binary.
//!
//! Layers `UNIMATCH_*` environment variables over an optional TOML file,
//! opens the SQLite store and serves the JSON API until Ctrl-C.
//!
//! ```
//! unimatch-server --config /etc/unimatch/config.toml
//! unimatch-server --hash-password    # prints a value for auth_password_hash
//! ```

use std::{
  io::{self, BufRead, Write},
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, bail};
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use unimatch_core::engine::MatchEngine;
use unimatch_server::{AppState, ServerConfig};
use unimatch_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "unimatch API server")]
struct Cli {
  /// TOML configuration file. Missing files are tolerated so that a
  /// deployment can be configured through the environment alone.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Read a password from stdin, print its argon2 PHC string and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  if cli.hash_password {
    println!("{}", hash_password(&prompt_password()?)?);
    return Ok(());
  }

  let cfg = load_config(&cli.config)?;
  serve(cfg).await
}

fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let cfg: ServerConfig = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("UNIMATCH"))
    .build()
    .with_context(|| format!("failed to load configuration from {}", path.display()))?
    .try_deserialize()
    .context("invalid server configuration")?;

  if cfg.auth_username.is_empty() || cfg.auth_password_hash.is_empty() {
    bail!("auth_username and auth_password_hash must both be set");
  }
  Ok(cfg)
}

async fn serve(cfg: ServerConfig) -> anyhow::Result<()> {
  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {}", store_path.display()))?;

  let app = unimatch_server::router(AppState {
    engine: Arc::new(MatchEngine::new(store)),
    auth:   Arc::new(cfg.auth()),
  });

  let address = format!("{}:{}", cfg.host, cfg.port);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  info!(store = %store_path.display(), "Listening on http://{address}");

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested, draining connections");
      }
    })
    .await
    .context("server error")
}

fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))
}

fn prompt_password() -> anyhow::Result<String> {
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~/` to `$HOME`.
fn expand_tilde(path: &Path) -> PathBuf {
  match (path.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tilde_expands_only_at_the_start() {
    let plain = Path::new("/var/lib/unimatch.db");
    assert_eq!(expand_tilde(plain), plain);
    assert_eq!(expand_tilde(Path::new("data/~/x.db")), Path::new("data/~/x.db"));
  }

  #[test]
  fn hashed_password_is_a_phc_string() {
    let hash = hash_password("hunter2").unwrap();
    assert!(hash.starts_with("$argon2"));
  }

  #[test]
  fn config_without_credentials_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = 9000\nauth_username = \"bot\"\nauth_password_hash = \"\"\n")
      .unwrap();

    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("auth_password_hash"));
  }
}
