use async_trait::async_trait;

use crate::domain::ReviewSummary;
use crate::providers::context::ProviderContext;
use crate::providers::error::ProviderError;
use crate::providers::traits::Provider;

/// Does nothing; useful for scaffolding a pipeline or gating on `if`/`goto`
/// alone.
pub struct NoopProvider;

#[async_trait]
impl Provider for NoopProvider {
    fn type_name(&self) -> &'static str {
        "noop"
    }

    fn supported_config_keys(&self) -> &'static [&'static str] {
        &[]
    }

    async fn execute(&self, _ctx: &ProviderContext<'_>) -> Result<ReviewSummary, ProviderError> {
        Ok(ReviewSummary::default())
    }
}
