//! Shared domain types for llm-chess-arena.
//!
//! Everything the orchestrator, the persistence layer, and the CLI agree on
//! lives here: side/winner enums, the failure and outcome taxonomies, the
//! move record shape, and per-match configuration with its defaults.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of full moves before a game is cut off as a draw.
pub const DEFAULT_MAX_FULL_MOVES: u32 = 150;

/// Default retry budget per turn (attempts = retries + 1).
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Default per-turn timeout for subprocess CLI providers.
///
/// CLI tools carry startup overhead on top of model latency, so they get a
/// longer budget than the API path.
pub const DEFAULT_CLI_TIMEOUT: Duration = Duration::from_secs(480);

/// Default per-turn timeout for HTTP API providers.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(300);

/// One side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a match. Every completed match has one; there is no
/// externally visible "unknown" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    White,
    Black,
    Draw,
}

impl Winner {
    pub fn as_str(self) -> &'static str {
        match self {
            Winner::White => "white",
            Winner::Black => "black",
            Winner::Draw => "draw",
        }
    }
}

impl From<Side> for Winner {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Winner::White,
            Side::Black => Winner::Black,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a match ended. String forms follow the database vocabulary of the
/// arena (`"insufficient"`, `"50move"`, ...), so they round-trip through
/// persisted rows unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeReason {
    #[serde(rename = "checkmate")]
    Checkmate,
    #[serde(rename = "stalemate")]
    Stalemate,
    #[serde(rename = "repetition")]
    Repetition,
    #[serde(rename = "insufficient")]
    InsufficientMaterial,
    #[serde(rename = "50move")]
    FiftyMove,
    #[serde(rename = "max_moves")]
    MaxMoves,
    /// A provider blew its per-turn budget. Forfeiting, never retried.
    #[serde(rename = "timeout")]
    Timeout,
    /// A provider explicitly resigned. Forfeiting, never retried.
    #[serde(rename = "resignation")]
    Resignation,
    /// The retry budget was exhausted without a legal move.
    #[serde(rename = "invalid_move")]
    InvalidMove,
}

impl OutcomeReason {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeReason::Checkmate => "checkmate",
            OutcomeReason::Stalemate => "stalemate",
            OutcomeReason::Repetition => "repetition",
            OutcomeReason::InsufficientMaterial => "insufficient",
            OutcomeReason::FiftyMove => "50move",
            OutcomeReason::MaxMoves => "max_moves",
            OutcomeReason::Timeout => "timeout",
            OutcomeReason::Resignation => "resignation",
            OutcomeReason::InvalidMove => "invalid_move",
        }
    }

    /// True for the reasons produced by a failed ply rather than the board.
    pub fn is_forfeit(self) -> bool {
        matches!(
            self,
            OutcomeReason::Timeout | OutcomeReason::Resignation | OutcomeReason::InvalidMove
        )
    }
}

impl fmt::Display for OutcomeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The terminal result of one game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub winner: Winner,
    pub reason: OutcomeReason,
    pub total_half_moves: u32,
    /// FEN of the final position.
    pub final_fen: String,
}

/// One accepted move, in the shape the persistence layer stores it.
/// Written immediately after the move is applied and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub match_id: i64,
    /// 1-based full-move number: `ceil((half_moves_played + 1) / 2)`.
    pub move_number: u32,
    pub side: Side,
    pub san: String,
    pub uci: String,
    pub fen_after: String,
    /// JSON array of per-attempt transcript strings (raw provider output
    /// and attempt annotations).
    pub rationale: String,
}

/// A model taking one side of a match.
///
/// `provider_id` is namespaced (`anthropic/...`, `deepseek/...`); the
/// namespace decides whether moves are requested through a native CLI or
/// the OpenRouter API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub id: i64,
    pub name: String,
    pub provider_id: String,
}

/// Per-match configuration. `None` fields fall back to the arena defaults;
/// the defaults themselves are configuration, not ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub match_id: i64,
    pub white: ModelRef,
    pub black: ModelRef,
    pub max_full_moves: Option<u32>,
    pub turn_timeout: Option<Duration>,
    pub max_retries: Option<u32>,
}

impl GameConfig {
    pub fn new(match_id: i64, white: ModelRef, black: ModelRef) -> Self {
        Self {
            match_id,
            white,
            black,
            max_full_moves: None,
            turn_timeout: None,
            max_retries: None,
        }
    }

    pub fn max_half_moves(&self) -> u32 {
        self.max_full_moves.unwrap_or(DEFAULT_MAX_FULL_MOVES) * 2
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn model(&self, side: Side) -> &ModelRef {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_opponent_flips() {
        assert_eq!(Side::White.opponent(), Side::Black);
        assert_eq!(Side::Black.opponent(), Side::White);
    }

    #[test]
    fn reason_strings_match_db_vocabulary() {
        assert_eq!(OutcomeReason::InsufficientMaterial.as_str(), "insufficient");
        assert_eq!(OutcomeReason::FiftyMove.as_str(), "50move");
        assert_eq!(OutcomeReason::MaxMoves.as_str(), "max_moves");
        assert_eq!(OutcomeReason::InvalidMove.as_str(), "invalid_move");
    }

    #[test]
    fn forfeit_reasons_are_flagged() {
        assert!(OutcomeReason::Timeout.is_forfeit());
        assert!(OutcomeReason::Resignation.is_forfeit());
        assert!(OutcomeReason::InvalidMove.is_forfeit());
        assert!(!OutcomeReason::Checkmate.is_forfeit());
        assert!(!OutcomeReason::MaxMoves.is_forfeit());
    }

    #[test]
    fn winner_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Winner::White).unwrap(), "\"white\"");
        assert_eq!(serde_json::to_string(&Winner::Draw).unwrap(), "\"draw\"");
    }

    #[test]
    fn config_defaults_resolve() {
        let white = ModelRef {
            id: 1,
            name: "A".into(),
            provider_id: "anthropic/claude".into(),
        };
        let black = ModelRef {
            id: 2,
            name: "B".into(),
            provider_id: "deepseek/deepseek-chat".into(),
        };
        let config = GameConfig::new(7, white, black);
        assert_eq!(config.max_half_moves(), 300);
        assert_eq!(config.max_retries(), 1);
    }
}
