//! Match orchestration engine for llm-chess-arena.
//!
//! Drives a single chess game between two external move providers —
//! subprocess CLIs or the OpenRouter API — validating every move against
//! the rules engine, enforcing per-turn timeouts and retry budgets, and
//! resolving forfeits by position evaluation.
//!
//! The crate is a library with one entry point, [`runner::run_game`]; each
//! game session is expected to run as its own tokio task, strictly
//! sequential inside.

pub mod error;
pub mod eval;
pub mod extract;
pub mod prompt;
pub mod provider;
pub mod runner;
pub mod session;
pub mod store;
pub mod turn;

pub use error::{ArenaError, ProviderError};
pub use eval::{MaterialEvaluator, PositionEvaluator, StockfishEvaluator};
pub use provider::{provider_for, MoveProvider};
pub use runner::run_game;
pub use session::GameSession;
pub use store::MatchStore;
