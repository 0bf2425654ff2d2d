//! quill-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `QUILL_*` environment variables, opens the SQLite store, seeds the
//! adventure-type catalog and serves the JSON API over HTTP.
//!
//! Nested keys use a double underscore, e.g. `QUILL_GENERATOR__API_KEY`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use quill_api::AppState;
use quill_server::{Generator, ServerConfig, seed_adventure_types};
use quill_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Quill adventure server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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
    .add_source(
      config::Environment::with_prefix("QUILL")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  anyhow::ensure!(server_cfg.max_chapters >= 1, "max_chapters must be at least 1");
  anyhow::ensure!(server_cfg.choices_per_step >= 1, "choices_per_step must be at least 1");

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let seeded = seed_adventure_types(&store, &server_cfg.adventure_types)
    .await
    .context("failed to seed adventure types")?;
  if seeded > 0 {
    tracing::info!(seeded, "adventure type catalog updated");
  }

  let generator =
    Generator::from_config(&server_cfg).context("failed to configure narrative generator")?;
  tracing::info!(kind = ?generator.kind(), "narrative generator ready");

  // Build application state.
  let state = AppState::new(
    Arc::new(store),
    generator,
    server_cfg.story_settings(),
    server_cfg.hourly_adventure_cap,
  );

  let app = quill_server::app(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
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
