//! `memory` check type: direct memory-store mutations driven by config
//! payload (`operation`, `key`, `value`/`value_js`, `namespace`) rather
//! than expressions embedded in another provider's prompt (§4.3, §4.9).

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::ReviewSummary;
use crate::providers::context::ProviderContext;
use crate::providers::error::ProviderError;
use crate::providers::traits::Provider;
use crate::sandbox::{Sandbox, Scope};

pub struct MemoryOpsProvider;

fn build_scope<'a>(ctx: &'a ProviderContext<'a>) -> Scope<'a> {
    let outputs = serde_json::to_value(
        ctx.dependency_outputs
            .iter()
            .map(|(k, v)| (k.clone(), v.as_scope_value()))
            .collect::<HashMap<_, _>>(),
    )
    .unwrap_or(serde_json::Value::Null);
    Scope::new(
        outputs,
        ctx.history,
        ctx.event,
        ctx.memory.snapshot_all(),
        ctx.memory.default_namespace().to_string(),
    )
}

#[async_trait]
impl Provider for MemoryOpsProvider {
    fn type_name(&self) -> &'static str {
        "memory"
    }

    fn supported_config_keys(&self) -> &'static [&'static str] {
        &["operation", "key", "value", "value_js", "namespace"]
    }

    async fn execute(&self, ctx: &ProviderContext<'_>) -> Result<ReviewSummary, ProviderError> {
        let operation = ctx
            .config
            .payload_str("operation")
            .ok_or_else(|| ProviderError::Execution("memory check is missing 'operation'".to_string()))?;
        let namespace = ctx.config.payload_str("namespace");
        let key = ctx.config.payload_str("key").unwrap_or_default();

        let value = if let Some(expr) = ctx.config.payload_str("value_js") {
            let scope = build_scope(ctx);
            let sandbox = Sandbox::new();
            sandbox.evaluate(expr, &scope).map_err(|e| ProviderError::Execution(e.to_string()))?
        } else {
            ctx.config.payload.get("value").cloned().unwrap_or(serde_json::Value::Null)
        };

        let output = match operation {
            "get" => ctx.memory.get(key, namespace),
            "has" => Some(serde_json::Value::Bool(ctx.memory.has(key, namespace))),
            "set" => {
                ctx.memory.set(key, value.clone(), namespace);
                Some(value)
            }
            "append" => {
                ctx.memory.append(key, value.clone(), namespace);
                ctx.memory.get(key, namespace)
            }
            "increment" => {
                let amount = value.as_f64();
                let next = ctx
                    .memory
                    .increment(key, amount, namespace)
                    .map_err(|e| ProviderError::Execution(e.to_string()))?;
                Some(serde_json::json!(next))
            }
            "delete" => Some(serde_json::Value::Bool(ctx.memory.delete(key, namespace))),
            "clear" => {
                ctx.memory.clear(namespace);
                None
            }
            other => return Err(ProviderError::Execution(format!("unknown memory operation '{other}'"))),
        };

        Ok(ReviewSummary { output, ..ReviewSummary::default() })
    }
}
