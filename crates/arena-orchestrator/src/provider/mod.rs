//! Move providers: the external actors that produce moves.
//!
//! Two kinds exist — native CLI subprocesses and the OpenRouter HTTP API —
//! behind one capability trait, so the orchestrator never branches on kind.
//! The provider identifier's namespace prefix picks the implementation.

pub mod cli;
pub mod openrouter;

use std::time::Duration;

use async_trait::async_trait;

use arena_core::{ModelRef, DEFAULT_API_TIMEOUT, DEFAULT_CLI_TIMEOUT};

use crate::error::{ArenaError, ProviderError};

pub use cli::CliProvider;
pub use openrouter::OpenRouterProvider;

/// An external move-generating actor for one side of a match.
#[async_trait]
pub trait MoveProvider: Send + Sync {
    /// Send one prompt and return the raw text reply. Bound by a hard
    /// wall-clock `timeout`; on expiry the underlying process or request is
    /// forcibly terminated, not merely abandoned.
    async fn request_move(&self, prompt: &str, timeout: Duration)
        -> Result<String, ProviderError>;
}

/// Namespaces served by a native CLI instead of OpenRouter.
const CLI_PREFIXES: [&str; 4] = ["anthropic/", "openai/", "google/", "opencode/"];

/// Whether this identifier routes to a CLI subprocess.
pub fn is_cli_provider(provider_id: &str) -> bool {
    CLI_PREFIXES
        .iter()
        .any(|prefix| provider_id.starts_with(prefix))
}

/// Default per-turn timeout, distinguished by provider kind.
pub fn default_turn_timeout(provider_id: &str) -> Duration {
    if is_cli_provider(provider_id) {
        DEFAULT_CLI_TIMEOUT
    } else {
        DEFAULT_API_TIMEOUT
    }
}

/// Build the provider for a model. CLI namespaces get the routed
/// subprocess; every other namespace goes through OpenRouter.
pub fn provider_for(model: &ModelRef) -> Result<Box<dyn MoveProvider>, ArenaError> {
    if is_cli_provider(&model.provider_id) {
        Ok(Box::new(CliProvider::for_provider_id(&model.provider_id)?))
    } else {
        Ok(Box::new(OpenRouterProvider::new(model.provider_id.clone())))
    }
}

/// Limit free-form error text to its first `limit` characters.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_namespaces_are_recognized() {
        assert!(is_cli_provider("anthropic/claude-sonnet-4.5"));
        assert!(is_cli_provider("openai/gpt-5.1"));
        assert!(is_cli_provider("google/gemini-3-pro"));
        assert!(is_cli_provider("opencode/grok-code"));
        assert!(!is_cli_provider("deepseek/deepseek-chat"));
        assert!(!is_cli_provider("x-ai/grok-4"));
    }

    #[test]
    fn timeout_defaults_differ_by_kind() {
        assert_eq!(
            default_turn_timeout("anthropic/claude-sonnet-4.5"),
            DEFAULT_CLI_TIMEOUT
        );
        assert_eq!(
            default_turn_timeout("deepseek/deepseek-chat"),
            DEFAULT_API_TIMEOUT
        );
    }
}
