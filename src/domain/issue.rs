//! [`Issue`] — the unit of finding a provider reports.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Security,
    Performance,
    Style,
    Logic,
    Documentation,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Style => "style",
            Self::Logic => "logic",
            Self::Documentation => "documentation",
        };
        write!(f, "{s}")
    }
}

/// One finding returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub file: String,
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    pub rule_id: String,
    pub message: String,
    pub severity: Severity,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

impl Issue {
    /// Key used for de-duplication in the aggregator (§4.8 of the spec).
    pub fn dedup_key(&self) -> (String, u32, String, String) {
        (self.file.clone(), self.line, self.rule_id.clone(), self.message.clone())
    }

    /// Build a synthetic system issue for an engine-level failure (timeouts,
    /// provider exceptions, routing failures, fail_if / failure_conditions).
    pub fn system(rule_id: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            file: String::new(),
            line: 0,
            end_line: None,
            rule_id: rule_id.into(),
            message: message.into(),
            severity,
            category: Category::Logic,
            suggestion: None,
            replacement: None,
        }
    }

    /// Prefix `rule_id` with `check/<checkName>/` the way the aggregator tags
    /// issues before they leave the engine (§4.8).
    pub fn tagged_for(mut self, check_name: &str) -> Self {
        self.rule_id = format!("check/{check_name}/{}", self.rule_id);
        self
    }
}
