//! Trigger events a check's `on` list is filtered against (§4.5 step 1).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    PrOpened,
    PrUpdated,
    IssueOpened,
    IssueComment,
    Manual,
    #[serde(untagged)]
    Custom(String),
}

impl TriggerEvent {
    pub fn name(&self) -> &str {
        match self {
            Self::PrOpened => "pr_opened",
            Self::PrUpdated => "pr_updated",
            Self::IssueOpened => "issue_opened",
            Self::IssueComment => "issue_comment",
            Self::Manual => "manual",
            Self::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for TriggerEvent {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pr_opened" => Self::PrOpened,
            "pr_updated" => Self::PrUpdated,
            "issue_opened" => Self::IssueOpened,
            "issue_comment" => Self::IssueComment,
            "manual" => Self::Manual,
            other => Self::Custom(other.to_string()),
        })
    }
}
