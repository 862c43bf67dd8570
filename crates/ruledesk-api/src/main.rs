//! Ruledesk server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `RULEDESK_*`
//! environment overrides, opens the SQLite store, and serves the JSON API.
//!
//! # Bootstrapping an account
//!
//! With signup disabled, create the first user from the command line; the
//! password is read from stdin:
//!
//! ```
//! cargo run -p ruledesk-api --bin ruledesk-server -- --create-user ops@example.com
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;
use ruledesk_api::{AppState, ServerConfig, auth::hash_password};
use ruledesk_core::{account::Credentials, store::AccountStore};
use ruledesk_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Parser)]
#[command(author, version, about = "Ruledesk engagement-rule server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create an account for this email (password on stdin) and exit.
  #[arg(long, value_name = "EMAIL")]
  create_user: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("RULEDESK").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: create an account and exit.
  if let Some(email) = cli.create_user {
    let password = read_password()?;
    let creds = Credentials { email, password }.validate()?;
    let user = store
      .create_user(creds.email, hash_password(&creds.password)?)
      .await
      .context("failed to create user")?;
    println!("created {} ({})", user.email, user.user_id);
    return Ok(());
  }

  spawn_session_purge(store.clone());

  let state = AppState {
    store:  Arc::new(store),
    config: Arc::new(server_cfg.clone()),
  };

  let app = ruledesk_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Periodically drop expired sessions so the table does not grow unbounded.
fn spawn_session_purge(store: SqliteStore) {
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(PURGE_INTERVAL);
    loop {
      ticker.tick().await;
      match store.purge_expired_sessions(Utc::now()).await {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, "purged expired sessions"),
        Err(e) => tracing::warn!(error = %e, "session purge failed"),
      }
    }
  });
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
