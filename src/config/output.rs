//! `output.pr_comment` configuration (§4.8, §6): report rendering and
//! grouping. Rendering itself (table/markdown/sarif text) is a front-end
//! concern; the execution core only needs `group_by` and `collapse` to
//! shape the `ExecutionReport`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Table,
    Json,
    Markdown,
    Sarif,
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self::Table
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Check,
    Category,
}

impl Default for GroupBy {
    fn default() -> Self {
        Self::Check
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrCommentConfig {
    pub format: ReportFormat,
    pub group_by: GroupBy,
    pub collapse: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub pr_comment: PrCommentConfig,
}
