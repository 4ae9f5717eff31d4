//! Error types for the orchestrator.
//!
//! Everything a provider or the extractor gets wrong is converted into a
//! failed attempt inside the turn executor; only two categories escape the
//! core as real errors: persistence failures and unroutable provider
//! identifiers.

use thiserror::Error;

/// Failure of a single provider invocation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider exceeded its wall-clock budget. Fatal for the ply —
    /// a model that cannot respond within budget loses outright, so
    /// retrying would reward exactly the behavior being penalized.
    #[error("provider timed out")]
    Timeout,

    /// Transport or process error (non-zero exit, HTTP error, bad payload).
    /// Retryable up to the ply's retry budget.
    #[error("provider failure: {0}")]
    Failure(String),
}

/// Infrastructure-level error surfaced by `run_game`. The game loop never
/// retries these; the caller is expected to mark the match failed.
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("storage error: {0}")]
    Store(#[from] anyhow::Error),

    /// A provider identifier that cannot be routed to a concrete command.
    /// Detected before any move is played.
    #[error("provider configuration error: {0}")]
    Config(String),
}
