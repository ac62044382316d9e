//! Schemata server binary.
//!
//! `server [--config <path>]` serves the registry's JSON API from a SQLite
//! store. `server hash-password` reads a password from stdin and prints the
//! PHC string to put in `auth_password_hash`.

use std::{io, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use schemata_core::Registry;
use schemata_server::{
  AppState, ServerConfig,
  auth::{self, AuthConfig},
  collab::ServerCollaborators,
};
use schemata_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Schemata log-type schema registry")]
struct Cli {
  /// TOML configuration file; `SCHEMATA_*` variables override its keys.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Hash the password read from stdin for `auth_password_hash`.
  HashPassword,
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
  match cli.command {
    Some(Command::HashPassword) => {
      let input = io::read_to_string(io::stdin()).context("failed to read stdin")?;
      let password = input.lines().next().unwrap_or_default();
      let hash =
        auth::hash_password(password).map_err(|e| anyhow::anyhow!("argon2: {e}"))?;
      println!("{hash}");
      Ok(())
    }
    None => serve(load_config(cli.config)?).await,
  }
}

fn load_config(path: PathBuf) -> anyhow::Result<ServerConfig> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("SCHEMATA"))
    .build()
    .and_then(|settings| settings.try_deserialize())
    .context("invalid server configuration")
}

async fn serve(cfg: ServerConfig) -> anyhow::Result<()> {
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {}", cfg.store_path.display()))?
    .with_page_size(cfg.scan_page_size);
  let collab =
    ServerCollaborators::from_config(&cfg).context("failed to build collaborators")?;

  let registry = Arc::new(Registry::new(store, collab));
  match registry.min_applied_release().await {
    Ok(Some(release)) => tracing::info!(%release, "managed schemas present"),
    Ok(None) => tracing::info!("no managed schemas applied yet"),
    Err(e) => tracing::warn!(error = %e, "could not read release watermark"),
  }

  let app = schemata_server::router(AppState {
    registry,
    auth: Arc::new(AuthConfig {
      username:      cfg.auth_username,
      password_hash: cfg.auth_password_hash,
    }),
  });

  let address = format!("{}:{}", cfg.host, cfg.port);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!(%address, "serving schema registry");

  axum::serve(listener, app).await.context("server error")
}
