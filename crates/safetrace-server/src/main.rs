//! SafeTrace server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus
//! `SAFETRACE_*` environment overrides, opens the configured store, and serves
//! the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for an account's `password_hash`:
//!
//! ```
//! cargo run -p safetrace-server --bin safetrace -- --hash-password
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use rand_core::OsRng;
use safetrace_api::{AppState, auth::AuthConfig, worker::spawn_fan_out};
use safetrace_core::{memory::MemoryStore, notify::Transport, store::SafetyStore};
use safetrace_server::{
  ServerConfig,
  config::Backend,
  transport,
};
use safetrace_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "SafeTrace emergency alert server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
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

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let transport = transport::from_config(&server_cfg.notify)?;

  match server_cfg.storage.backend {
    Backend::Sqlite => {
      let path = server_cfg.storage.resolved_path();
      let store = SqliteStore::open(&path)
        .await
        .with_context(|| format!("failed to open store at {path:?}"))?;
      tracing::info!(?path, "using SQLite store");
      serve(server_cfg, store, transport).await
    }
    Backend::Memory => {
      tracing::warn!("using in-memory store; data is lost on restart");
      serve(server_cfg, MemoryStore::new(), transport).await
    }
  }
}

async fn serve<S>(
  server_cfg: ServerConfig,
  store: S,
  transport: Arc<dyn Transport>,
) -> anyhow::Result<()>
where
  S: SafetyStore + 'static,
{
  if server_cfg.accounts.is_empty() {
    tracing::warn!("no accounts configured; only anonymous submissions are accepted");
  }

  let state = AppState::new(
    Arc::new(store),
    transport,
    AuthConfig::new(server_cfg.accounts.clone()),
    server_cfg.api.clone(),
  );

  if server_cfg.notify.on_create {
    spawn_fan_out(&state.hub, state.notifier.clone());
  }

  let app = safetrace_api::router(state);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
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
