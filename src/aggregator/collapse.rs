//! De-duplication pass for the Result Aggregator (§4.8): identical findings
//! (same file, line, ruleId, message) reported across multiple iterations
//! of a `forEach` check collapse into one. This runs unconditionally —
//! §4.8 specifies de-duplication as aggregation behavior, not an opt-in.
//! `output.pr_comment.collapse` only controls whether the repeat count gets
//! folded into the message (`(xN)`); it never brings duplicates back.

use std::collections::HashMap;

use crate::domain::Issue;

pub fn collapse_issues(issues: Vec<Issue>, annotate_occurrences: bool) -> Vec<Issue> {
    let mut order: Vec<(String, u32, String, String)> = Vec::new();
    let mut first: HashMap<(String, u32, String, String), Issue> = HashMap::new();
    let mut counts: HashMap<(String, u32, String, String), u32> = HashMap::new();

    for issue in issues {
        let key = issue.dedup_key();
        *counts.entry(key.clone()).or_insert(0) += 1;
        first.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            issue
        });
    }

    order
        .into_iter()
        .map(|key| {
            let mut issue = first.remove(&key).expect("every ordered key has a first occurrence");
            let count = counts[&key];
            if annotate_occurrences && count > 1 {
                issue.message = format!("{} (x{count})", issue.message);
            }
            issue
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Severity};

    fn issue(file: &str, line: u32, rule: &str, message: &str) -> Issue {
        Issue {
            file: file.to_string(),
            line,
            end_line: None,
            rule_id: rule.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
            category: Category::Style,
            suggestion: None,
            replacement: None,
        }
    }

    #[test]
    fn identical_findings_collapse_with_a_count_when_annotated() {
        let issues = vec![
            issue("a.rs", 10, "check/x/r", "unused import"),
            issue("a.rs", 10, "check/x/r", "unused import"),
            issue("a.rs", 10, "check/x/r", "unused import"),
        ];
        let collapsed = collapse_issues(issues, true);
        assert_eq!(collapsed.len(), 1);
        assert_eq!(collapsed[0].message, "unused import (x3)");
    }

    #[test]
    fn identical_findings_always_dedup_even_without_annotation() {
        let issues = vec![
            issue("a.rs", 10, "check/x/r", "unused import"),
            issue("a.rs", 10, "check/x/r", "unused import"),
        ];
        let collapsed = collapse_issues(issues, false);
        assert_eq!(collapsed.len(), 1);
        assert_eq!(collapsed[0].message, "unused import", "no annotation means no '(xN)' suffix, but the duplicate is still gone");
    }

    #[test]
    fn distinct_findings_are_preserved_in_order() {
        let issues = vec![issue("a.rs", 1, "check/x/r", "one"), issue("b.rs", 2, "check/x/r", "two")];
        let collapsed = collapse_issues(issues, true);
        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0].message, "one");
        assert_eq!(collapsed[1].message, "two");
    }

    #[test]
    fn single_occurrence_message_is_unchanged() {
        let issues = vec![issue("a.rs", 1, "check/x/r", "solo")];
        let collapsed = collapse_issues(issues, true);
        assert_eq!(collapsed[0].message, "solo");
    }
}
