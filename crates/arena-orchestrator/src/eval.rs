//! Position evaluation for forfeiture resolution.
//!
//! The game loop calls this exactly once, when a ply fails: the sign of the
//! score decides the match, so a provider cannot hand its opponent a win by
//! crashing in a position it was winning. Stockfish over UCI is the primary
//! source; a material count from the FEN is the built-in fallback, which is
//! why `evaluate` is infallible.

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::warn;

/// Stand-in score for a forced mate, well outside the centipawn range.
const MATE_SCORE: i32 = 99_999;

/// Scores a position in centipawns from White's perspective.
#[async_trait]
pub trait PositionEvaluator: Send + Sync {
    async fn evaluate(&self, fen: &str) -> i32;
}

/// UCI evaluation via a stockfish subprocess, with material fallback.
pub struct StockfishEvaluator {
    binary: String,
    depth: u32,
    budget: Duration,
}

impl Default for StockfishEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl StockfishEvaluator {
    pub fn new() -> Self {
        Self {
            binary: std::env::var("STOCKFISH_BIN").unwrap_or_else(|_| "stockfish".into()),
            depth: 12,
            budget: Duration::from_secs(10),
        }
    }

    async fn evaluate_uci(&self, fen: &str) -> anyhow::Result<i32> {
        let mut child = Command::new(&self.binary)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.binary))?;

        let mut stdin = child.stdin.take().context("stockfish stdin unavailable")?;
        let stdout = child.stdout.take().context("stockfish stdout unavailable")?;
        let depth = self.depth;

        let search = async move {
            stdin.write_all(b"uci\n").await?;
            let mut lines = BufReader::new(stdout).lines();
            let mut ready = false;
            let mut last_cp = 0i32;
            while let Some(line) = lines.next_line().await? {
                if line == "uciok" {
                    stdin
                        .write_all(format!("position fen {fen}\ngo depth {depth}\n").as_bytes())
                        .await?;
                    ready = true;
                    continue;
                }
                if !ready {
                    continue;
                }
                if let Some(cp) = parse_score(&line, "cp") {
                    last_cp = cp;
                }
                if let Some(mate) = parse_score(&line, "mate") {
                    last_cp = if mate > 0 { MATE_SCORE } else { -MATE_SCORE };
                }
                if line.starts_with("bestmove") {
                    let _ = stdin.write_all(b"quit\n").await;
                    return Ok(last_cp);
                }
            }
            bail!("stockfish closed its pipe before bestmove")
        };

        let result = tokio::time::timeout(self.budget, search).await;
        let _ = child.start_kill();
        let cp = result.map_err(|_| anyhow::anyhow!("stockfish evaluation timed out"))??;
        Ok(white_perspective(cp, fen))
    }
}

#[async_trait]
impl PositionEvaluator for StockfishEvaluator {
    async fn evaluate(&self, fen: &str) -> i32 {
        match self.evaluate_uci(fen).await {
            Ok(cp) => cp,
            Err(error) => {
                warn!("stockfish evaluation failed, using material count: {error:#}");
                material_score(fen)
            }
        }
    }
}

/// Pure material count, used standalone where no engine is wanted.
pub struct MaterialEvaluator;

#[async_trait]
impl PositionEvaluator for MaterialEvaluator {
    async fn evaluate(&self, fen: &str) -> i32 {
        material_score(fen)
    }
}

/// UCI reports scores from the side to move; flip to White's perspective.
fn white_perspective(cp: i32, fen: &str) -> i32 {
    if fen.split_whitespace().nth(1) == Some("b") {
        -cp
    } else {
        cp
    }
}

/// Extract `score <unit> <n>` from a UCI info line.
fn parse_score(line: &str, unit: &str) -> Option<i32> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens
        .windows(3)
        .find(|window| window[0] == "score" && window[1] == unit)
        .and_then(|window| window[2].parse().ok())
}

/// Centipawn material count from the FEN's piece placement field.
fn material_score(fen: &str) -> i32 {
    let placement = fen.split_whitespace().next().unwrap_or("");
    placement
        .chars()
        .map(|piece| match piece {
            'P' => 100,
            'N' | 'B' => 300,
            'R' => 500,
            'Q' => 900,
            'p' => -100,
            'n' | 'b' => -300,
            'r' => -500,
            'q' => -900,
            _ => 0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn material_is_balanced_at_start() {
        assert_eq!(material_score(START_FEN), 0);
    }

    #[test]
    fn material_counts_missing_pieces() {
        // Black queen gone.
        let fen = "rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1";
        assert_eq!(material_score(fen), 900);
        // White rook gone.
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBN1 w Qkq - 0 1";
        assert_eq!(material_score(fen), -500);
    }

    #[test]
    fn parses_uci_score_lines() {
        assert_eq!(
            parse_score("info depth 12 seldepth 18 score cp -42 nodes 12345", "cp"),
            Some(-42)
        );
        assert_eq!(parse_score("info depth 20 score mate 3 pv h5f7", "mate"), Some(3));
        assert_eq!(parse_score("info depth 12 nodes 12345", "cp"), None);
        // `score mate` must not be read as a cp score.
        assert_eq!(parse_score("info depth 20 score mate -2", "cp"), None);
    }

    #[test]
    fn normalizes_to_white_perspective() {
        let black_to_move = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        assert_eq!(white_perspective(35, START_FEN), 35);
        assert_eq!(white_perspective(35, black_to_move), -35);
    }

    #[tokio::test]
    async fn material_evaluator_uses_the_count() {
        let fen = "rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1";
        assert_eq!(MaterialEvaluator.evaluate(fen).await, 900);
    }
}
