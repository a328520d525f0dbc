//! Resolves `CheckConfig.check_type` to a [`Provider`] implementation
//! (§4.4), mirroring the teacher's `ToolExecutor`'s name→implementation
//! map.

use std::collections::HashMap;

use super::builtin::{CommandProvider, LoggerProvider, MemoryOpsProvider, NoopProvider, TransformProvider};
use super::context::ProviderContext;
use super::error::ProviderError;
use super::traits::Provider;
use crate::domain::ReviewSummary;

pub struct ProviderRegistry {
    providers: HashMap<String, Box<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self { providers: HashMap::new() }
    }

    /// Registry pre-loaded with the providers the execution core itself
    /// implements. Out-of-process providers (AI, HTTP/OpenAPI) are outside
    /// this crate's scope per §1 and are registered by the embedding CLI.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.add(Box::new(NoopProvider));
        registry.add(Box::new(LoggerProvider));
        registry.add(Box::new(CommandProvider));
        registry.add(Box::new(MemoryOpsProvider));
        registry.add(Box::new(TransformProvider));
        registry
    }

    pub fn add(&mut self, provider: Box<dyn Provider>) {
        self.providers.insert(provider.type_name().to_string(), provider);
    }

    pub fn resolve(&self, type_name: &str) -> Option<&dyn Provider> {
        self.providers.get(type_name).map(|b| b.as_ref())
    }

    pub async fn execute(&self, type_name: &str, ctx: &ProviderContext<'_>) -> Result<ReviewSummary, ProviderError> {
        let provider = self
            .resolve(type_name)
            .ok_or_else(|| ProviderError::UnknownType(type_name.to_string()))?;
        provider.execute(ctx).await
    }
}
