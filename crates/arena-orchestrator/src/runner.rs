//! Game loop: drives one match from the starting position to a terminal
//! outcome.
//!
//! One invocation owns the session exclusively; everything inside is
//! strictly sequential, and moves are persisted one at a time in ply order.
//!
//! Forfeiture policy: when a ply fails, the opponent is NOT automatically
//! the winner. For a timeout or an exhausted retry budget the current
//! position is evaluated once and the sign decides — which can award the
//! win to the side that just failed. An explicit resignation is the
//! exception: resigning concedes to the opponent directly.

use tracing::info;

use arena_core::{GameConfig, GameOutcome, MoveRecord, OutcomeReason, Side, Winner};

use crate::error::ArenaError;
use crate::eval::PositionEvaluator;
use crate::provider::{default_turn_timeout, MoveProvider};
use crate::session::GameSession;
use crate::store::MatchStore;
use crate::turn::{execute_turn, PlyFailure};

/// Run one game to completion. Returns an error only when persistence
/// itself fails; every in-game failure becomes a regular `GameOutcome`.
pub async fn run_game(
    store: &dyn MatchStore,
    evaluator: &dyn PositionEvaluator,
    white: &dyn MoveProvider,
    black: &dyn MoveProvider,
    config: &GameConfig,
) -> Result<GameOutcome, ArenaError> {
    let match_id = config.match_id;
    store.mark_running(match_id).await?;
    info!(
        "[match {match_id}] {} (white) vs {} (black)",
        config.white.name, config.black.name
    );

    let mut session = GameSession::new();
    let max_half_moves = config.max_half_moves();

    while !session.is_game_over() && session.half_moves() < max_half_moves {
        let side = session.side_to_move();
        let provider: &dyn MoveProvider = match side {
            Side::White => white,
            Side::Black => black,
        };
        let model = config.model(side);
        let opponent = config.model(side.opponent());
        let timeout = config
            .turn_timeout
            .unwrap_or_else(|| default_turn_timeout(&model.provider_id));

        match execute_turn(
            &mut session,
            provider,
            &opponent.name,
            config.max_retries(),
            timeout,
        )
        .await
        {
            Ok(ply) => {
                let half_moves = session.half_moves();
                let record = MoveRecord {
                    match_id,
                    move_number: half_moves.div_ceil(2),
                    side,
                    san: ply.san,
                    uci: ply.uci,
                    fen_after: ply.fen_after,
                    rationale: serde_json::to_string(&ply.transcript).unwrap_or_default(),
                };
                store.append_move(&record).await?;
                if half_moves % 10 == 0 {
                    info!(
                        "[match {match_id}] {half_moves} half-moves played, fen: {}",
                        session.fen()
                    );
                }
            }
            Err(failure) => {
                let reason: OutcomeReason = failure.into();
                let winner = resolve_forfeit(evaluator, &session, side, failure, match_id).await;
                return finish(store, match_id, winner, reason, &session).await;
            }
        }
    }

    let (winner, reason) = match session.game_over_reason() {
        Some(end) => end.outcome(),
        None => (Winner::Draw, OutcomeReason::MaxMoves),
    };
    info!(
        "[match {match_id}] finished: {winner} ({reason}) after {} half-moves",
        session.half_moves()
    );
    finish(store, match_id, winner, reason, &session).await
}

/// Decide the winner of a forfeited game.
///
/// Resignation concedes outright. For every other failure the position is
/// evaluated once: positive favors White, negative Black, zero is a draw —
/// whoever held the better position wins, independent of who caused the
/// forfeit.
async fn resolve_forfeit(
    evaluator: &dyn PositionEvaluator,
    session: &GameSession,
    failing_side: Side,
    failure: PlyFailure,
    match_id: i64,
) -> Winner {
    if failure == PlyFailure::Resignation {
        let winner: Winner = failing_side.opponent().into();
        info!("[match {match_id}] {failing_side} resigns, {winner} wins");
        return winner;
    }

    let cp = evaluator.evaluate(&session.fen()).await;
    let winner = match cp {
        cp if cp > 0 => Winner::White,
        cp if cp < 0 => Winner::Black,
        _ => Winner::Draw,
    };
    info!(
        "[match {match_id}] forfeit by {failing_side} ({}), eval {cp}cp -> {winner}",
        OutcomeReason::from(failure)
    );
    winner
}

async fn finish(
    store: &dyn MatchStore,
    match_id: i64,
    winner: Winner,
    reason: OutcomeReason,
    session: &GameSession,
) -> Result<GameOutcome, ArenaError> {
    store
        .complete_match(match_id, winner, reason, &session.movetext(), session.half_moves())
        .await?;
    Ok(GameOutcome {
        winner,
        reason,
        total_half_moves: session.half_moves(),
        final_fen: session.fen(),
    })
}
