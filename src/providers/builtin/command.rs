//! Shell command provider, grounded in the teacher's `bash` tool
//! (`tools/builtin/run_command.rs`): spawn `sh -c <exec>` in the project
//! root, capture stdout/stderr, map a non-zero exit to a failed summary
//! rather than throwing.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::domain::ReviewSummary;
use crate::providers::context::ProviderContext;
use crate::providers::error::ProviderError;
use crate::providers::traits::Provider;

const MAX_OUTPUT_CHARS: usize = 30_000;

pub struct CommandProvider;

#[async_trait]
impl Provider for CommandProvider {
    fn type_name(&self) -> &'static str {
        "command"
    }

    fn supported_config_keys(&self) -> &'static [&'static str] {
        &["exec"]
    }

    async fn execute(&self, ctx: &ProviderContext<'_>) -> Result<ReviewSummary, ProviderError> {
        let exec = ctx
            .config
            .payload_str("exec")
            .ok_or_else(|| ProviderError::Execution("command check is missing 'exec'".to_string()))?;

        let timeout = Duration::from_millis(ctx.config.timeout_ms);
        debug!(check_id = %ctx.config.id, %exec, "command provider executing");

        let output = match tokio::time::timeout(
            timeout,
            tokio::process::Command::new("sh").arg("-c").arg(exec).current_dir(ctx.worktree()).output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ProviderError::Execution(format!("failed to spawn command: {e}"))),
            Err(_) => return Err(ProviderError::Timeout),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = if stdout.is_empty() && !stderr.is_empty() {
            stderr.to_string()
        } else if stderr.is_empty() {
            stdout.to_string()
        } else {
            format!("{stdout}\n\nSTDERR:\n{stderr}")
        };
        let truncated = if combined.len() > MAX_OUTPUT_CHARS {
            format!("{}...\n[truncated, {} chars total]", &combined[..MAX_OUTPUT_CHARS], combined.len())
        } else {
            combined
        };

        if output.status.success() {
            Ok(ReviewSummary {
                content: Some(truncated),
                output: Some(serde_json::json!({ "exit_code": output.status.code().unwrap_or(0) })),
                ..ReviewSummary::default()
            })
        } else {
            Ok(ReviewSummary {
                content: Some(truncated.clone()),
                error: Some(format!("exit code {}", output.status.code().unwrap_or(-1))),
                output: Some(serde_json::json!({ "exit_code": output.status.code().unwrap_or(-1) })),
                ..ReviewSummary::default()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use crate::domain::HistoryMap;
    use crate::memory::MemoryStore;
    use crate::providers::context::PrInfo;
    use crate::providers::test_support::context;
    use std::collections::HashMap;

    fn config_with_exec(exec: &str) -> CheckConfig {
        let mut c = CheckConfig::default();
        c.id = "cmd".to_string();
        c.check_type = "command".to_string();
        c.payload = serde_json::json!({ "exec": exec });
        c
    }

    #[tokio::test]
    async fn succeeds_and_captures_stdout() {
        let config = config_with_exec("echo hello");
        let pr_info = PrInfo::default();
        let deps = HashMap::new();
        let memory = MemoryStore::new(Default::default());
        let history = HistoryMap::new();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&pr_info, &config, &deps, &memory, &history, dir.path());
        let result = CommandProvider.execute(&ctx).await.unwrap();
        assert!(result.error.is_none());
        assert!(result.content.unwrap().contains("hello"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_failed_summary_not_an_error() {
        let config = config_with_exec("exit 1");
        let pr_info = PrInfo::default();
        let deps = HashMap::new();
        let memory = MemoryStore::new(Default::default());
        let history = HistoryMap::new();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&pr_info, &config, &deps, &memory, &history, dir.path());
        let result = CommandProvider.execute(&ctx).await.unwrap();
        assert!(result.error.is_some());
    }
}
