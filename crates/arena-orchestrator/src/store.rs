//! Persistence contract consumed by the game loop.
//!
//! Storage itself lives outside the core (the `backend` crate provides the
//! sqlite implementation); the loop only needs these four operations, called
//! strictly in ply order. Errors here are the single fatal category of the
//! whole design — the loop never retries them.

use async_trait::async_trait;

use arena_core::{MoveRecord, OutcomeReason, Winner};

use crate::error::ArenaError;

#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Mark the match running. The only side effect visible before any
    /// moves exist.
    async fn mark_running(&self, match_id: i64) -> Result<(), ArenaError>;

    /// Persist one accepted move. Records are immutable once written.
    async fn append_move(&self, record: &MoveRecord) -> Result<(), ArenaError>;

    /// Persist the terminal outcome.
    async fn complete_match(
        &self,
        match_id: i64,
        winner: Winner,
        reason: OutcomeReason,
        movetext: &str,
        total_half_moves: u32,
    ) -> Result<(), ArenaError>;

    /// Infrastructure-level abort only; unreachable from normal play.
    async fn mark_failed(&self, match_id: i64) -> Result<(), ArenaError>;
}
