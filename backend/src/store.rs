//! Sqlite persistence: models, matches and moves.
//!
//! `SqliteStore` owns the pool and implements the orchestrator's
//! [`MatchStore`] contract on top of it, plus the model CRUD and the
//! post-game stats bookkeeping the HTTP surface needs.

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sqlx::{Pool, Sqlite};

use arena_core::{ModelRef, MoveRecord, OutcomeReason, Winner};
use arena_orchestrator::error::ArenaError;
use arena_orchestrator::store::MatchStore;

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

/// A row of the `models` table. Stats are cumulative across all finished
/// matches of the model.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ModelRow {
    pub id: i64,
    pub name: String,
    pub provider_id: String,
    pub games_played: i64,
    pub wins: i64,
    pub draws: i64,
    pub losses: i64,
    pub created_at: String,
}

impl ModelRow {
    pub fn to_ref(&self) -> ModelRef {
        ModelRef {
            id: self.id,
            name: self.name.clone(),
            provider_id: self.provider_id.clone(),
        }
    }
}

/// A row of the `matches` table. `result` and `result_reason` are null
/// until the match completes; `total_moves` counts half-moves.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MatchRow {
    pub id: i64,
    pub white_model_id: i64,
    pub black_model_id: i64,
    pub result: Option<String>,
    pub result_reason: Option<String>,
    pub pgn: Option<String>,
    pub status: String,
    pub total_moves: i64,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// A row of the `moves` table, one per accepted ply.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MoveRow {
    pub id: i64,
    pub match_id: i64,
    pub move_number: i64,
    pub color: String,
    pub san: String,
    pub uci: String,
    pub fen_after: String,
    pub thinking: Option<String>,
    pub created_at: String,
}

impl SqliteStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create the tables if they do not exist yet.
    pub async fn init_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS models (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                provider_id TEXT NOT NULL UNIQUE,
                games_played INTEGER NOT NULL DEFAULT 0,
                wins INTEGER NOT NULL DEFAULT 0,
                draws INTEGER NOT NULL DEFAULT 0,
                losses INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .context("creating models table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                white_model_id INTEGER NOT NULL REFERENCES models(id),
                black_model_id INTEGER NOT NULL REFERENCES models(id),
                result TEXT,
                result_reason TEXT,
                pgn TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                total_moves INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                completed_at TEXT
            );",
        )
        .execute(&self.pool)
        .await
        .context("creating matches table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS moves (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                match_id INTEGER NOT NULL REFERENCES matches(id),
                move_number INTEGER NOT NULL,
                color TEXT NOT NULL,
                san TEXT NOT NULL,
                uci TEXT NOT NULL,
                fen_after TEXT NOT NULL,
                thinking TEXT,
                created_at TEXT NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .context("creating moves table")?;

        Ok(())
    }

    pub async fn create_model(&self, name: &str, provider_id: &str) -> anyhow::Result<ModelRow> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO models (name, provider_id, created_at) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(provider_id)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .context("inserting model")?;

        self.get_model(id)
            .await?
            .context("model vanished after insert")
    }

    pub async fn get_model(&self, id: i64) -> anyhow::Result<Option<ModelRow>> {
        sqlx::query_as("SELECT * FROM models WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("fetching model")
    }

    pub async fn list_models(&self) -> anyhow::Result<Vec<ModelRow>> {
        sqlx::query_as("SELECT * FROM models ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("listing models")
    }

    /// Create a pending match row and return its id.
    pub async fn create_match(&self, white_model_id: i64, black_model_id: i64) -> anyhow::Result<i64> {
        sqlx::query_scalar(
            "INSERT INTO matches (white_model_id, black_model_id, status, created_at)
             VALUES ($1, $2, 'pending', $3) RETURNING id",
        )
        .bind(white_model_id)
        .bind(black_model_id)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .context("inserting match")
    }

    pub async fn get_match(&self, id: i64) -> anyhow::Result<Option<MatchRow>> {
        sqlx::query_as("SELECT * FROM matches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("fetching match")
    }

    pub async fn match_moves(&self, match_id: i64) -> anyhow::Result<Vec<MoveRow>> {
        sqlx::query_as("SELECT * FROM moves WHERE match_id = $1 ORDER BY id")
            .bind(match_id)
            .fetch_all(&self.pool)
            .await
            .context("fetching moves")
    }

    /// Settle both models' W/D/L tallies for a finished match.
    pub async fn apply_match_result(
        &self,
        white_model_id: i64,
        black_model_id: i64,
        winner: Winner,
    ) -> anyhow::Result<()> {
        let (white_wdl, black_wdl) = match winner {
            Winner::White => ((1, 0, 0), (0, 0, 1)),
            Winner::Black => ((0, 0, 1), (1, 0, 0)),
            Winner::Draw => ((0, 1, 0), (0, 1, 0)),
        };
        self.bump_stats(white_model_id, white_wdl).await?;
        self.bump_stats(black_model_id, black_wdl).await
    }

    async fn bump_stats(&self, model_id: i64, (wins, draws, losses): (i64, i64, i64)) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE models SET games_played = games_played + 1,
                 wins = wins + $2, draws = draws + $3, losses = losses + $4
             WHERE id = $1",
        )
        .bind(model_id)
        .bind(wins)
        .bind(draws)
        .bind(losses)
        .execute(&self.pool)
        .await
        .context("updating model stats")?;
        Ok(())
    }
}

#[async_trait]
impl MatchStore for SqliteStore {
    async fn mark_running(&self, match_id: i64) -> Result<(), ArenaError> {
        sqlx::query("UPDATE matches SET status = 'running' WHERE id = $1")
            .bind(match_id)
            .execute(&self.pool)
            .await
            .context("marking match running")?;
        Ok(())
    }

    async fn append_move(&self, record: &MoveRecord) -> Result<(), ArenaError> {
        sqlx::query(
            "INSERT INTO moves (match_id, move_number, color, san, uci, fen_after, thinking, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(record.match_id)
        .bind(record.move_number as i64)
        .bind(record.side.as_str())
        .bind(&record.san)
        .bind(&record.uci)
        .bind(&record.fen_after)
        .bind(&record.rationale)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("inserting move")?;
        Ok(())
    }

    async fn complete_match(
        &self,
        match_id: i64,
        winner: Winner,
        reason: OutcomeReason,
        movetext: &str,
        total_half_moves: u32,
    ) -> Result<(), ArenaError> {
        sqlx::query(
            "UPDATE matches SET status = 'completed', result = $2, result_reason = $3,
                 pgn = $4, total_moves = $5, completed_at = $6
             WHERE id = $1",
        )
        .bind(match_id)
        .bind(winner.as_str())
        .bind(reason.as_str())
        .bind(movetext)
        .bind(total_half_moves as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("completing match")?;
        Ok(())
    }

    async fn mark_failed(&self, match_id: i64) -> Result<(), ArenaError> {
        sqlx::query("UPDATE matches SET status = 'failed', completed_at = $2 WHERE id = $1")
            .bind(match_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("marking match failed")?;
        Ok(())
    }
}
