//! Persistence and HTTP surface for llm-chess-arena.
//!
//! Wraps the orchestrator with a sqlite-backed [`store::SqliteStore`], the
//! fire-and-forget match bootstrap in [`start`], and the axum router in
//! [`api`].

pub mod api;
pub mod start;
pub mod store;

pub use arena_orchestrator::store::MatchStore;
pub use start::{run_match, start_match};
pub use store::SqliteStore;
