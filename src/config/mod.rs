//! Configuration model (§4.9, §6): the typed representation of a pipeline
//! document.

mod check;
mod dependency;
mod failure_condition;
mod load;
mod memory_config;
mod normalize;
mod output;
mod retry;
mod routing;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use check::CheckConfig;
pub use dependency::DependencyToken;
pub use failure_condition::FailureConditionSpec;
pub use load::{expand_env_refs, load_file, load_str};
pub use memory_config::{MemoryConfig, MemoryFormat, MemoryStorage};
pub use output::{GroupBy, OutputConfig, PrCommentConfig, ReportFormat};
pub use retry::RetryPolicy;
pub use routing::RoutingAction;

use crate::error::VisorError;

fn default_max_parallelism() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub env: BTreeMap<String, String>,
    pub ai_provider: Option<String>,
    pub ai_model: Option<String>,
    pub ai_temperature: Option<f64>,
    #[serde(default = "default_max_parallelism")]
    pub max_parallelism: usize,
    pub memory: MemoryConfig,
    pub checks: BTreeMap<String, CheckConfig>,
    pub output: OutputConfig,
    pub fail_if: Option<String>,
    pub failure_conditions: BTreeMap<String, FailureConditionSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            env: BTreeMap::new(),
            ai_provider: None,
            ai_model: None,
            ai_temperature: None,
            max_parallelism: default_max_parallelism(),
            memory: MemoryConfig::default(),
            checks: BTreeMap::new(),
            output: OutputConfig::default(),
            fail_if: None,
            failure_conditions: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load-time validation that doesn't require the dependency graph
    /// (§3 invariant: `onFinish` only on `forEach` checks; §7 `config/*`).
    pub fn validate(&self) -> Result<(), VisorError> {
        for check in self.checks.values() {
            check.validate().map_err(|message| VisorError::Config {
                kind: "on_finish".to_string(),
                message,
            })?;
            for dep in &check.depends_on {
                for member in dep.members() {
                    if !self.checks.contains_key(member) {
                        return Err(VisorError::Config {
                            kind: "unknown_dependency".to_string(),
                            message: format!("check '{}' depends on unknown check '{member}'", check.id),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_dependency() {
        let yaml = r#"
checks:
  a:
    type: noop
    depends_on: b
"#;
        let err = load_str(yaml).unwrap_err();
        assert!(matches!(err, VisorError::Config { .. }));
    }
}
