//! `depends_on` tokens: a plain check id, or a pipe-separated ANY-OF group
//! (§3, §4.5 step 3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyToken {
    Single(String),
    AnyOf(Vec<String>),
}

impl DependencyToken {
    pub fn parse(raw: &str) -> Self {
        if raw.contains('|') {
            Self::AnyOf(raw.split('|').map(|s| s.trim().to_string()).collect())
        } else {
            Self::Single(raw.trim().to_string())
        }
    }

    pub fn members(&self) -> &[String] {
        match self {
            Self::Single(s) => std::slice::from_ref(s),
            Self::AnyOf(v) => v,
        }
    }

    pub fn is_any_of(&self) -> bool {
        matches!(self, Self::AnyOf(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_any_of_group() {
        let t = DependencyToken::parse("parse-issue|parse-comment");
        assert!(t.is_any_of());
        assert_eq!(t.members(), &["parse-issue".to_string(), "parse-comment".to_string()]);
    }

    #[test]
    fn parses_single_dependency() {
        let t = DependencyToken::parse("list-issues");
        assert!(!t.is_any_of());
        assert_eq!(t.members(), &["list-issues".to_string()]);
    }
}
