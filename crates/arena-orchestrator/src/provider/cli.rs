//! CLI move provider: spawns a vendor CLI, pipes the prompt to stdin and
//! captures stdout.
//!
//! Routing by namespace prefix:
//!   `anthropic/*` → `claude -p`, `openai/*` → `codex exec`,
//!   `google/*` → `gemini -p`, `opencode/*` → `opencode run`.
//! An unrecognized CLI prefix is a configuration error, caught at
//! construction rather than mid-game.
//!
//! The reader may kill the process early once a `MOVE:` line appears —
//! the answer is complete, waiting for natural exit only adds latency.
//! That shortcut is not success: extraction still decides downstream.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::debug;

use crate::error::{ArenaError, ProviderError};
use crate::provider::{truncate_chars, MoveProvider};

/// Max characters of stderr carried into a failure message.
const STDERR_LIMIT: usize = 500;

/// A routed CLI invocation template for one model.
#[derive(Debug, Clone)]
pub struct CliProvider {
    command: String,
    args: Vec<String>,
    /// Environment variables removed for this invocation only. Used to
    /// keep the claude CLI from detecting a nested session.
    env_remove: Vec<String>,
}

impl CliProvider {
    /// Resolve a namespaced provider identifier to a concrete command.
    pub fn for_provider_id(provider_id: &str) -> Result<Self, ArenaError> {
        if let Some(model) = provider_id.strip_prefix("anthropic/") {
            // The claude CLI names models with dashes where the API id
            // uses dots.
            let cli_model = model.replace('.', "-");
            return Ok(Self {
                command: "claude".into(),
                args: vec![
                    "-p".into(),
                    "--model".into(),
                    cli_model,
                    "--tools".into(),
                    String::new(),
                    "--no-session-persistence".into(),
                ],
                env_remove: vec!["CLAUDECODE".into()],
            });
        }
        if let Some(model) = provider_id.strip_prefix("openai/") {
            return Ok(Self {
                command: "codex".into(),
                args: vec![
                    "exec".into(),
                    "-m".into(),
                    model.into(),
                    "--skip-git-repo-check".into(),
                    "--ephemeral".into(),
                    "-".into(),
                ],
                env_remove: Vec::new(),
            });
        }
        if let Some(model) = provider_id.strip_prefix("google/") {
            return Ok(Self {
                command: "gemini".into(),
                args: vec![
                    "-p".into(),
                    String::new(),
                    "-m".into(),
                    model.into(),
                    "-o".into(),
                    "text".into(),
                ],
                env_remove: Vec::new(),
            });
        }
        if provider_id.starts_with("opencode/") {
            // opencode expects the full namespaced id.
            return Ok(Self {
                command: "opencode".into(),
                args: vec![
                    "run".into(),
                    "-m".into(),
                    provider_id.into(),
                    "--format".into(),
                    "default".into(),
                ],
                env_remove: Vec::new(),
            });
        }
        Err(ArenaError::Config(format!(
            "no CLI route for provider id `{provider_id}`"
        )))
    }
}

#[async_trait]
impl MoveProvider for CliProvider {
    async fn request_move(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for var in &self.env_remove {
            command.env_remove(var);
        }

        let mut child = command.spawn().map_err(|e| {
            ProviderError::Failure(format!("failed to spawn `{}`: {e}", self.command))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProviderError::Failure("child stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProviderError::Failure("child stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProviderError::Failure("child stderr unavailable".into()))?;

        if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
            // A fast-failing child may close stdin before reading the
            // prompt; its exit status and stderr still decide the result.
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(ProviderError::Failure(format!("failed to write prompt: {e}")));
            }
        }
        drop(stdin); // close the pipe so the CLI sees EOF

        // On expiry the future is dropped and kill_on_drop reaps the child;
        // the process is terminated, not abandoned.
        match tokio::time::timeout(timeout, collect_output(&self.command, child, stdout, stderr))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                debug!(command = %self.command, "CLI provider hit its turn budget");
                Err(ProviderError::Timeout)
            }
        }
    }
}

async fn collect_output(
    command: &str,
    mut child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
) -> Result<String, ProviderError> {
    // Drain stderr concurrently so neither pipe can fill up and stall the
    // child.
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        let mut reader = BufReader::new(stderr);
        let _ = reader.read_to_string(&mut buf).await;
        buf
    });

    let mut lines = BufReader::new(stdout).lines();
    let mut output = String::new();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| ProviderError::Failure(format!("failed to read `{command}` output: {e}")))?
    {
        let is_marker = line
            .trim_start()
            .get(..5)
            .is_some_and(|head| head.eq_ignore_ascii_case("MOVE:"));
        output.push_str(&line);
        output.push('\n');
        if is_marker {
            // Complete answer; no need to wait for natural exit.
            let _ = child.start_kill();
            stderr_task.abort();
            return Ok(output);
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| ProviderError::Failure(format!("failed to reap `{command}`: {e}")))?;
    if !status.success() {
        let stderr_text = stderr_task.await.unwrap_or_default();
        return Err(ProviderError::Failure(format!(
            "`{command}` exited with {status}: {}",
            truncate_chars(&stderr_text, STDERR_LIMIT)
        )));
    }
    stderr_task.abort();
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_anthropic_to_claude_with_dashed_model() {
        let provider = CliProvider::for_provider_id("anthropic/claude-sonnet-4.5").unwrap();
        assert_eq!(provider.command, "claude");
        assert!(provider
            .args
            .contains(&"claude-sonnet-4-5".to_string()));
        assert_eq!(provider.env_remove, vec!["CLAUDECODE".to_string()]);
    }

    #[test]
    fn routes_openai_google_opencode() {
        let codex = CliProvider::for_provider_id("openai/gpt-5.1").unwrap();
        assert_eq!(codex.command, "codex");
        assert_eq!(codex.args[0], "exec");

        let gemini = CliProvider::for_provider_id("google/gemini-3-pro").unwrap();
        assert_eq!(gemini.command, "gemini");
        assert!(gemini.args.contains(&"gemini-3-pro".to_string()));

        let opencode = CliProvider::for_provider_id("opencode/grok-code").unwrap();
        assert_eq!(opencode.command, "opencode");
        // opencode keeps the full namespaced id.
        assert!(opencode.args.contains(&"opencode/grok-code".to_string()));
    }

    #[test]
    fn unknown_prefix_is_a_configuration_error() {
        let err = CliProvider::for_provider_id("deepseek/deepseek-chat").unwrap_err();
        assert!(matches!(err, ArenaError::Config(_)));
    }

    fn shell(script: &str) -> CliProvider {
        CliProvider {
            command: "sh".into(),
            args: vec!["-c".into(), script.into()],
            env_remove: Vec::new(),
        }
    }

    #[tokio::test]
    async fn captures_stdout_of_a_clean_exit() {
        let provider = shell("echo thinking; echo final answer");
        let output = provider
            .request_move("prompt", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(output.contains("thinking"));
        assert!(output.contains("final answer"));
    }

    #[tokio::test]
    async fn returns_early_on_move_marker() {
        // The marker line ends the read without waiting out the sleep.
        let provider = shell("echo 'MOVE: e4'; sleep 30");
        let start = std::time::Instant::now();
        let output = provider
            .request_move("prompt", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(output.contains("MOVE: e4"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn timeout_kills_and_reports_timeout() {
        let provider = shell("sleep 30");
        let err = provider
            .request_move("prompt", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout));
    }

    #[tokio::test]
    async fn fast_exit_without_reading_stdin_still_surfaces_stderr() {
        // The child never reads the prompt; a prompt bigger than the pipe
        // buffer forces the write to hit a closed pipe after the exit.
        let provider = shell("echo boom >&2; exit 3");
        let prompt = "x".repeat(1 << 20);
        let err = provider
            .request_move(&prompt, Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            ProviderError::Failure(message) => assert!(message.contains("boom")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_surfaces_stderr() {
        let provider = shell("echo boom >&2; exit 3");
        let err = provider
            .request_move("prompt", Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            ProviderError::Failure(message) => assert!(message.contains("boom")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
