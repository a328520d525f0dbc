use async_trait::async_trait;
use tracing::info;

use crate::domain::ReviewSummary;
use crate::providers::context::ProviderContext;
use crate::providers::error::ProviderError;
use crate::providers::traits::Provider;

/// Renders `content` (already template-expanded by the scheduler) through
/// `tracing` at info level. Mainly useful for debugging a pipeline's
/// routing/forEach behavior without a real AI/HTTP provider configured.
pub struct LoggerProvider;

#[async_trait]
impl Provider for LoggerProvider {
    fn type_name(&self) -> &'static str {
        "logger"
    }

    fn supported_config_keys(&self) -> &'static [&'static str] {
        &["content"]
    }

    async fn execute(&self, ctx: &ProviderContext<'_>) -> Result<ReviewSummary, ProviderError> {
        let content = ctx.config.payload_str("content").unwrap_or_default().to_string();
        info!(check_id = %ctx.config.id, %content, "logger check");
        Ok(ReviewSummary {
            content: Some(content),
            ..ReviewSummary::default()
        })
    }
}
