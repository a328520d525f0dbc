//! `transform` check type: a pure computation step over dependency
//! outputs, expressed via the same `transform`/`transform_js` fields the
//! scheduler also applies generically to any check's output (§4.6.4). This
//! provider is for checks whose entire purpose is deriving a new value,
//! rather than post-processing another provider's result.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::ReviewSummary;
use crate::providers::context::ProviderContext;
use crate::providers::error::ProviderError;
use crate::providers::traits::Provider;
use crate::sandbox::{Sandbox, Scope};

pub struct TransformProvider;

#[async_trait]
impl Provider for TransformProvider {
    fn type_name(&self) -> &'static str {
        "transform"
    }

    fn supported_config_keys(&self) -> &'static [&'static str] {
        &["transform", "transform_js"]
    }

    async fn execute(&self, ctx: &ProviderContext<'_>) -> Result<ReviewSummary, ProviderError> {
        let outputs = serde_json::to_value(
            ctx.dependency_outputs
                .iter()
                .map(|(k, v)| (k.clone(), v.as_scope_value()))
                .collect::<HashMap<_, _>>(),
        )
        .unwrap_or(serde_json::Value::Null);

        let scope = Scope::new(
            outputs,
            ctx.history,
            ctx.event,
            ctx.memory.snapshot_all(),
            ctx.memory.default_namespace().to_string(),
        );

        let value = if let Some(script) = ctx.config.payload_str("transform_js") {
            let sandbox = Sandbox::new();
            sandbox.evaluate_script(script, &scope).map_err(|e| ProviderError::Execution(e.to_string()))?
        } else if let Some(expr) = ctx.config.payload_str("transform") {
            let sandbox = Sandbox::new();
            sandbox.evaluate(expr, &scope).map_err(|e| ProviderError::Execution(e.to_string()))?
        } else {
            return Err(ProviderError::Execution(
                "transform check requires 'transform' or 'transform_js'".to_string(),
            ));
        };

        Ok(ReviewSummary { output: Some(value), ..ReviewSummary::default() })
    }
}
