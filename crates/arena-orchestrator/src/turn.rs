//! Turn executor: drives one ply through build → call → extract → validate.
//!
//! At most `max_retries + 1` attempts. Two failures end the ply on the
//! spot: a timeout (the forfeiture-triggering condition; retrying would
//! reward the behavior being penalized) and an explicit resignation.
//! Everything else — transport errors, unparseable replies, illegal moves —
//! burns an attempt and retries with an escalated prompt that names the
//! rejected token.

use std::time::Duration;

use tracing::debug;

use arena_core::OutcomeReason;

use crate::error::ProviderError;
use crate::extract::{extract_move, Extraction};
use crate::prompt::{build_prompt, RetryWarning, TurnPrompt};
use crate::provider::MoveProvider;
use crate::session::GameSession;

/// An accepted ply, ready to be persisted.
#[derive(Debug)]
pub struct PlySuccess {
    pub san: String,
    pub uci: String,
    pub fen_after: String,
    /// Raw provider output and attempt annotations, in order. Becomes the
    /// move record's rationale blob.
    pub transcript: Vec<String>,
}

/// A ply that forfeits the game. `ProviderFailure` never appears here: it
/// is retryable and collapses into `InvalidMove` once attempts run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyFailure {
    Timeout,
    Resignation,
    InvalidMove,
}

impl From<PlyFailure> for OutcomeReason {
    fn from(failure: PlyFailure) -> Self {
        match failure {
            PlyFailure::Timeout => OutcomeReason::Timeout,
            PlyFailure::Resignation => OutcomeReason::Resignation,
            PlyFailure::InvalidMove => OutcomeReason::InvalidMove,
        }
    }
}

/// Execute one ply for the side to move. On success the session has the
/// move applied; on failure the session is unchanged and no move record
/// should be created.
pub async fn execute_turn(
    session: &mut GameSession,
    provider: &dyn MoveProvider,
    opponent: &str,
    max_retries: u32,
    timeout: Duration,
) -> Result<PlySuccess, PlyFailure> {
    let side = session.side_to_move();
    let mut transcript: Vec<String> = Vec::new();
    let mut warning: Option<RetryWarning> = None;

    for attempt in 0..=max_retries {
        let legal_moves = session.legal_moves();
        let fen = session.fen();
        let prompt = {
            let turn = TurnPrompt {
                side,
                opponent,
                fen: &fen,
                move_number: session.full_move_number(),
                in_check: session.is_check(),
                legal_moves: &legal_moves,
                history: session.history(),
                warning: warning.as_ref(),
            };
            build_prompt(&turn)
        };

        let raw = match provider.request_move(&prompt, timeout).await {
            Ok(raw) => raw,
            Err(ProviderError::Timeout) => {
                debug!("{side} timed out on attempt {}", attempt + 1);
                return Err(PlyFailure::Timeout);
            }
            Err(ProviderError::Failure(message)) => {
                transcript.push(format!("[attempt {}] provider error: {message}", attempt + 1));
                warning = Some(RetryWarning::ProviderError);
                continue;
            }
        };

        match extract_move(&raw, &legal_moves) {
            Some(Extraction::Resign) => {
                transcript.push(raw);
                return Err(PlyFailure::Resignation);
            }
            Some(Extraction::Move(token)) => {
                transcript.push(raw);
                match session.apply_san(&token) {
                    Ok(applied) => {
                        return Ok(PlySuccess {
                            san: applied.san,
                            uci: applied.uci,
                            fen_after: applied.fen_after,
                            transcript,
                        });
                    }
                    Err(_) => {
                        // Can diverge from the provided list only in
                        // pathological cases; treated like any bad attempt.
                        transcript.push(format!(
                            "[attempt {}] engine rejected move: {token}",
                            attempt + 1
                        ));
                        warning = Some(RetryWarning::Rejected(token));
                    }
                }
            }
            None => {
                transcript.push(raw);
                transcript.push(format!("[attempt {}] no parseable move in reply", attempt + 1));
                warning = Some(RetryWarning::Unparsed);
            }
        }
    }

    Err(PlyFailure::InvalidMove)
}
