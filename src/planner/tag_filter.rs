//! Tag-based inclusion policy (§4.5 step 2, scenario S6).

#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

impl TagFilter {
    pub fn none() -> Self {
        Self::default()
    }

    /// A check with no tags is eligible only when no filter is configured.
    /// `include` is OR-matched; `exclude` always overrides `include`.
    pub fn matches(&self, tags: &[String]) -> bool {
        if let Some(exclude) = &self.exclude {
            if tags.iter().any(|t| exclude.contains(t)) {
                return false;
            }
        }
        match &self.include {
            None => true,
            Some(include) => tags.iter().any(|t| include.contains(t)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filter_includes_untagged_checks() {
        let f = TagFilter::none();
        assert!(f.matches(&[]));
    }

    #[test]
    fn include_requires_at_least_one_matching_tag() {
        let f = TagFilter {
            include: Some(vec!["fast".to_string()]),
            exclude: None,
        };
        assert!(f.matches(&["fast".to_string(), "security".to_string()]));
        assert!(!f.matches(&["slow".to_string()]));
        assert!(!f.matches(&[]));
    }

    #[test]
    fn exclude_overrides_include() {
        let f = TagFilter {
            include: Some(vec!["fast".to_string()]),
            exclude: Some(vec!["experimental".to_string()]),
        };
        assert!(!f.matches(&["fast".to_string(), "experimental".to_string()]));
    }
}
