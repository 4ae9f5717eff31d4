//! `arena` — run LLM chess matches from the command line or serve the API.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arena_core::GameConfig;
use backend::store::SqliteStore;
use backend::MatchStore;

#[derive(Parser)]
#[command(name = "arena", about = "Automated chess matches between language models")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server.
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
    /// Run one match in the foreground and print the outcome.
    Run {
        /// White model id.
        #[arg(long)]
        white: i64,
        /// Black model id.
        #[arg(long)]
        black: i64,
        /// Cut the game off as a draw after this many full moves.
        #[arg(long)]
        max_full_moves: Option<u32>,
        /// Per-turn timeout in seconds (default depends on provider kind).
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Extra attempts per turn after a bad reply.
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// Register a model.
    AddModel {
        #[arg(long)]
        name: String,
        /// Namespaced identifier, e.g. `anthropic/claude-sonnet-4.5` or
        /// `deepseek/deepseek-chat`.
        #[arg(long)]
        provider_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:arena.db".to_string());
    let options = SqliteConnectOptions::from_str(&database_url)
        .context("invalid database URL")?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("failed to connect to database")?;
    let store = SqliteStore::new(pool);
    store.init_schema().await?;

    match cli.command {
        Command::Serve { port } => serve(store, port).await,
        Command::Run {
            white,
            black,
            max_full_moves,
            timeout_secs,
            max_retries,
        } => run(store, white, black, max_full_moves, timeout_secs, max_retries).await,
        Command::AddModel { name, provider_id } => {
            let model = store.create_model(&name, &provider_id).await?;
            println!("model {}: {} ({})", model.id, model.name, model.provider_id);
            Ok(())
        }
    }
}

async fn serve(store: SqliteStore, port: u16) -> anyhow::Result<()> {
    let app = backend::api::router(store);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("API listening on {addr}");
    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}

async fn run(
    store: SqliteStore,
    white_id: i64,
    black_id: i64,
    max_full_moves: Option<u32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
) -> anyhow::Result<()> {
    let white = store
        .get_model(white_id)
        .await?
        .with_context(|| format!("model {white_id} not found"))?;
    let black = store
        .get_model(black_id)
        .await?
        .with_context(|| format!("model {black_id} not found"))?;

    let match_id = store.create_match(white.id, black.id).await?;
    let mut config = GameConfig::new(match_id, white.to_ref(), black.to_ref());
    config.max_full_moves = max_full_moves;
    config.turn_timeout = timeout_secs.map(Duration::from_secs);
    config.max_retries = max_retries;

    match backend::run_match(&store, &config).await {
        Ok(outcome) => {
            store
                .apply_match_result(white.id, black.id, outcome.winner)
                .await?;
            println!(
                "match {match_id}: {} ({}) after {} half-moves",
                outcome.winner, outcome.reason, outcome.total_half_moves
            );
            println!("final position: {}", outcome.final_fen);
            Ok(())
        }
        Err(error) => {
            store.mark_failed(match_id).await?;
            Err(error.into())
        }
    }
}
