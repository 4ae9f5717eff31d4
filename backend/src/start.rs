//! Match bootstrap: create the match row, run the game, settle stats.
//!
//! `start_match` is fire-and-forget — the HTTP handler returns the match id
//! immediately and the game runs in its own tokio task. The CLI path uses
//! `run_match` directly and awaits the outcome.

use tracing::{error, info, warn};

use arena_core::{GameConfig, GameOutcome};
use arena_orchestrator::error::ArenaError;
use arena_orchestrator::eval::StockfishEvaluator;
use arena_orchestrator::provider::provider_for;
use arena_orchestrator::runner::run_game;
use arena_orchestrator::store::MatchStore;

use crate::store::SqliteStore;

/// Run one match to completion against the store.
pub async fn run_match(store: &SqliteStore, config: &GameConfig) -> Result<GameOutcome, ArenaError> {
    let white = provider_for(&config.white)?;
    let black = provider_for(&config.black)?;
    let evaluator = StockfishEvaluator::default();
    run_game(store, &evaluator, white.as_ref(), black.as_ref(), config).await
}

/// Create a match between two stored models and launch it in the
/// background. Returns the match id as soon as the row exists.
///
/// The spawned task settles model stats on completion and marks the match
/// failed if the runner aborts on an infrastructure error.
pub async fn start_match(
    store: &SqliteStore,
    white_model_id: i64,
    black_model_id: i64,
) -> Result<i64, ArenaError> {
    let white = store
        .get_model(white_model_id)
        .await?
        .ok_or_else(|| ArenaError::Config(format!("model {white_model_id} not found")))?;
    let black = store
        .get_model(black_model_id)
        .await?
        .ok_or_else(|| ArenaError::Config(format!("model {black_model_id} not found")))?;

    let match_id = store.create_match(white_model_id, black_model_id).await?;
    let config = GameConfig::new(match_id, white.to_ref(), black.to_ref());

    let store = store.clone();
    tokio::spawn(async move {
        match run_match(&store, &config).await {
            Ok(outcome) => {
                info!(
                    "[match {match_id}] {} vs {}: {} ({})",
                    config.white.name, config.black.name, outcome.winner, outcome.reason
                );
                if let Err(error) = store
                    .apply_match_result(white_model_id, black_model_id, outcome.winner)
                    .await
                {
                    warn!("[match {match_id}] stats update failed: {error:#}");
                }
            }
            Err(error) => {
                error!("[match {match_id}] failed: {error}");
                if let Err(error) = store.mark_failed(match_id).await {
                    error!("[match {match_id}] could not mark failed: {error}");
                }
            }
        }
    });

    Ok(match_id)
}
