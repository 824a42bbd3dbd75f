use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hoshimi_core::store::{MemoryStore, PostgresStore};
use hoshimi_core::Store;
use hoshimi_server::config::ServerConfig;
use hoshimi_server::routes;
use hoshimi_server::sink::LogSink;
use hoshimi_server::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "hoshimi-server", about = "Performer livestream schedule aggregator")]
struct Args {
    /// Path to a TOML config file; `hoshimi.toml` is picked up by default.
    #[arg(long, env = "HOSHIMI_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,

    /// Run against an in-memory store instead of PostgreSQL.
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let store: Arc<dyn Store> = if args.in_memory {
        info!("using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let url = config
            .database
            .url
            .as_deref()
            .context("database.url is required unless --in-memory is set")?;
        let store = PostgresStore::connect(url)
            .await
            .context("connecting to PostgreSQL")?;
        sqlx::migrate!("./migrations")
            .run(store.pool())
            .await
            .context("running migrations")?;
        Arc::new(store)
    };

    let state = AppState {
        store,
        sink: Arc::new(LogSink),
        settings: config.engine.clone(),
        require_cron_header: config.require_cron_header,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(addr = %config.bind, "hoshimi server listening");

    axum::serve(listener, routes::router(state)).await?;

    Ok(())
}
