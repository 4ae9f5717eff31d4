//! Rules-engine seam: a single-owner wrapper around `shakmaty::Chess`.
//!
//! The session is the authoritative source of truth for one game. It is
//! owned exclusively by one game loop for the lifetime of the match and is
//! mutated once per accepted ply; nothing else touches the position.
//!
//! shakmaty detects checkmate, stalemate and insufficient material on its
//! own; threefold repetition and the fifty-move rule need history, so the
//! session tracks zobrist hash counts and reads the halfmove clock itself.

use std::collections::HashMap;

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};
use thiserror::Error;

use arena_core::{OutcomeReason, Side, Winner};

/// A move token the rules engine refused to apply.
#[derive(Debug, Error)]
#[error("engine rejected move: {token}")]
pub struct RejectedMove {
    pub token: String,
}

/// An accepted ply, with everything the move record needs.
#[derive(Debug, Clone)]
pub struct AppliedMove {
    /// Canonical SAN as the engine renders it (including `+`/`#`).
    pub san: String,
    pub uci: String,
    pub fen_after: String,
}

/// Why the board says the game is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Checkmate { winner: Side },
    Stalemate,
    Repetition,
    InsufficientMaterial,
    FiftyMove,
}

impl EndReason {
    pub fn outcome(self) -> (Winner, OutcomeReason) {
        match self {
            EndReason::Checkmate { winner } => (winner.into(), OutcomeReason::Checkmate),
            EndReason::Stalemate => (Winner::Draw, OutcomeReason::Stalemate),
            EndReason::Repetition => (Winner::Draw, OutcomeReason::Repetition),
            EndReason::InsufficientMaterial => {
                (Winner::Draw, OutcomeReason::InsufficientMaterial)
            }
            EndReason::FiftyMove => (Winner::Draw, OutcomeReason::FiftyMove),
        }
    }
}

/// Game state for one match, from the starting position to a terminal one.
pub struct GameSession {
    pos: Chess,
    history: Vec<String>,
    /// Occurrence counts of positions seen so far, for threefold detection.
    seen: HashMap<u64, u32>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSession {
    pub fn new() -> Self {
        let pos = Chess::default();
        let mut seen = HashMap::new();
        seen.insert(zobrist(&pos), 1);
        Self {
            pos,
            history: Vec::new(),
            seen,
        }
    }

    /// Start from an arbitrary position. History begins empty.
    pub fn from_fen(fen: &str) -> anyhow::Result<Self> {
        let parsed: Fen = fen.parse()?;
        let pos: Chess = parsed.into_position(CastlingMode::Standard)?;
        let mut seen = HashMap::new();
        seen.insert(zobrist(&pos), 1);
        Ok(Self {
            pos,
            history: Vec::new(),
            seen,
        })
    }

    pub fn fen(&self) -> String {
        Fen::from_position(self.pos.clone(), EnPassantMode::Legal).to_string()
    }

    pub fn side_to_move(&self) -> Side {
        match self.pos.turn() {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }

    pub fn is_check(&self) -> bool {
        self.pos.is_check()
    }

    /// Legal moves in canonical SAN, in the engine's stable generation order.
    pub fn legal_moves(&self) -> Vec<String> {
        self.pos
            .legal_moves()
            .iter()
            .map(|m| SanPlus::from_move(self.pos.clone(), m).to_string())
            .collect()
    }

    /// Apply a SAN token. Rejected tokens leave the position untouched.
    pub fn apply_san(&mut self, token: &str) -> Result<AppliedMove, RejectedMove> {
        let rejected = || RejectedMove {
            token: token.to_string(),
        };
        let parsed: SanPlus = token.trim().parse().map_err(|_| rejected())?;
        let m = parsed.san.to_move(&self.pos).map_err(|_| rejected())?;

        let san = SanPlus::from_move(self.pos.clone(), &m).to_string();
        let uci = m.to_uci(CastlingMode::Standard).to_string();
        self.pos.play_unchecked(&m);
        *self.seen.entry(zobrist(&self.pos)).or_insert(0) += 1;
        self.history.push(san.clone());

        Ok(AppliedMove {
            san,
            uci,
            fen_after: self.fen(),
        })
    }

    /// Number of half-moves played so far.
    pub fn half_moves(&self) -> u32 {
        self.history.len() as u32
    }

    /// 1-based full-move number of the side to move.
    pub fn full_move_number(&self) -> u32 {
        self.pos.fullmoves().get()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over_reason().is_some()
    }

    pub fn game_over_reason(&self) -> Option<EndReason> {
        if self.pos.is_checkmate() {
            // The side to move has been mated.
            return Some(EndReason::Checkmate {
                winner: self.side_to_move().opponent(),
            });
        }
        if self.pos.is_stalemate() {
            return Some(EndReason::Stalemate);
        }
        if self.pos.is_insufficient_material() {
            return Some(EndReason::InsufficientMaterial);
        }
        if self.pos.halfmoves() >= 100 {
            return Some(EndReason::FiftyMove);
        }
        if self.seen.get(&zobrist(&self.pos)).copied().unwrap_or(0) >= 3 {
            return Some(EndReason::Repetition);
        }
        None
    }

    /// Numbered movetext of the game so far, e.g. `1. e4 e5 2. Nf3`.
    pub fn movetext(&self) -> String {
        format_movetext(&self.history)
    }
}

fn zobrist(pos: &Chess) -> u64 {
    pos.zobrist_hash::<Zobrist64>(EnPassantMode::Legal).0
}

/// Render a SAN history as numbered full-move pairs.
pub fn format_movetext(moves: &[String]) -> String {
    let mut pairs = Vec::with_capacity(moves.len().div_ceil(2));
    for (i, chunk) in moves.chunks(2).enumerate() {
        match chunk {
            [white, black] => pairs.push(format!("{}. {} {}", i + 1, white, black)),
            [white] => pairs.push(format!("{}. {}", i + 1, white)),
            _ => unreachable!(),
        }
    }
    pairs.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(session: &mut GameSession, moves: &[&str]) {
        for m in moves {
            session.apply_san(m).unwrap();
        }
    }

    #[test]
    fn starting_position_basics() {
        let session = GameSession::new();
        assert_eq!(session.side_to_move(), Side::White);
        assert_eq!(session.half_moves(), 0);
        assert_eq!(session.full_move_number(), 1);
        assert!(!session.is_check());
        assert!(!session.is_game_over());
        assert_eq!(session.legal_moves().len(), 20);
    }

    #[test]
    fn rejects_illegal_and_garbage_tokens() {
        let mut session = GameSession::new();
        assert!(session.apply_san("e5").is_err());
        assert!(session.apply_san("Ke2").is_err());
        assert!(session.apply_san("not a move").is_err());
        // Position untouched after rejections.
        assert_eq!(session.half_moves(), 0);
        assert!(session.apply_san("e4").is_ok());
    }

    #[test]
    fn fools_mate_is_checkmate_for_black() {
        let mut session = GameSession::new();
        play(&mut session, &["f3", "e5", "g4", "Qh4#"]);
        assert!(session.is_game_over());
        let reason = session.game_over_reason().unwrap();
        assert_eq!(
            reason,
            EndReason::Checkmate {
                winner: Side::Black
            }
        );
        assert_eq!(reason.outcome(), (Winner::Black, OutcomeReason::Checkmate));
        assert_eq!(session.half_moves(), 4);
    }

    #[test]
    fn applied_move_reports_canonical_san_and_uci() {
        let mut session = GameSession::new();
        let applied = session.apply_san("e4").unwrap();
        assert_eq!(applied.san, "e4");
        assert_eq!(applied.uci, "e2e4");
        assert!(applied.fen_after.starts_with("rnbqkbnr/pppppppp/8/8/4P3"));
    }

    #[test]
    fn threefold_repetition_detected() {
        let mut session = GameSession::new();
        // Shuffle knights back to the start twice; the starting position
        // occurs for the third time after the second return.
        play(
            &mut session,
            &["Nf3", "Nf6", "Ng1", "Ng8", "Nf3", "Nf6", "Ng1", "Ng8"],
        );
        assert_eq!(session.game_over_reason(), Some(EndReason::Repetition));
    }

    #[test]
    fn fifty_move_rule_reads_halfmove_clock() {
        let mut session =
            GameSession::from_fen("8/8/8/4k3/8/4K3/8/7R w - - 99 80").unwrap();
        assert!(!session.is_game_over());
        session.apply_san("Rh4").unwrap();
        assert_eq!(session.game_over_reason(), Some(EndReason::FiftyMove));
    }

    #[test]
    fn movetext_pairs_full_moves() {
        let mut session = GameSession::new();
        play(&mut session, &["e4", "e5", "Nf3"]);
        assert_eq!(session.movetext(), "1. e4 e5 2. Nf3");
    }
}
