//! Provider contract (§4.4): a check's `type` resolves to a `Provider`
//! implementation via the [`super::registry::ProviderRegistry`].

use async_trait::async_trait;

use super::context::ProviderContext;
use super::error::ProviderError;
use crate::domain::ReviewSummary;

#[async_trait]
pub trait Provider: Send + Sync {
    /// The `type` value in `CheckConfig` that resolves to this provider.
    fn type_name(&self) -> &'static str;

    /// Payload keys this provider reads from `CheckConfig.payload`; used
    /// for config validation, not enforced at runtime by the registry.
    fn supported_config_keys(&self) -> &'static [&'static str];

    async fn execute(&self, ctx: &ProviderContext<'_>) -> Result<ReviewSummary, ProviderError>;
}

/// Marker helper so providers can build an error-shaped summary without
/// constructing `ReviewSummary` fields by hand.
pub fn failed_summary(message: impl Into<String>) -> ReviewSummary {
    ReviewSummary {
        error: Some(message.into()),
        ..ReviewSummary::default()
    }
}
