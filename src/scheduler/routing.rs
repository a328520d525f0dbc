//! Routing & Retry Controller (§4.7): owns `loopCount` per check for the
//! run, validates `goto`/`goto_js` targets are ancestors, and exposes the
//! `max_loops` guard. Retry (bounded re-attempts of the *same* WorkItem) is
//! a property of [`crate::config::RetryPolicy`] and deliberately never
//! touches the loop counter the way a `goto` re-entry does.

use std::collections::{HashMap, HashSet};

use crate::planner::{Plan, ResolvedDependency};

/// Routing controller state for one engine run.
#[derive(Debug, Default)]
pub struct RoutingController {
    loop_counts: HashMap<String, u32>,
}

impl RoutingController {
    pub fn loop_count(&self, check_id: &str) -> u32 {
        self.loop_counts.get(check_id).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, check_id: &str) -> u32 {
        let next = self.loop_count(check_id) + 1;
        self.loop_counts.insert(check_id.to_string(), next);
        next
    }

    /// §4.6.5 step 3 / §4.7: a goto target must be an ancestor of the
    /// routing check in the DAG, never a forward/downstream id — those are
    /// indistinguishable from ordinary scheduling and would make `goto`
    /// functionally a second dependency edge.
    pub fn is_ancestor(plan: &Plan, from_check: &str, candidate: &str) -> bool {
        if from_check == candidate {
            return false;
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![from_check];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            for dep in plan.direct_dependencies(id) {
                for member in dependency_members(dep) {
                    if member == candidate {
                        return true;
                    }
                    stack.push(member);
                }
            }
        }
        false
    }
}

fn dependency_members(dep: &ResolvedDependency) -> &[String] {
    match dep {
        ResolvedDependency::Single(id) => std::slice::from_ref(id),
        ResolvedDependency::AnyOf(ids) => ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_str;
    use crate::domain::TriggerEvent;
    use crate::planner::{build_plan, TagFilter};

    fn plan_for(yaml: &str) -> Plan {
        let config = load_str(yaml).unwrap();
        build_plan(&config, &TriggerEvent::Manual, &TagFilter::none()).unwrap()
    }

    #[test]
    fn direct_and_transitive_ancestors_are_recognized() {
        let plan = plan_for(
            r#"
checks:
  extract-facts:
    type: noop
  validate:
    type: noop
    depends_on: extract-facts
  aggregate:
    type: noop
    depends_on: validate
"#,
        );
        assert!(RoutingController::is_ancestor(&plan, "aggregate", "extract-facts"));
        assert!(RoutingController::is_ancestor(&plan, "aggregate", "validate"));
        assert!(!RoutingController::is_ancestor(&plan, "extract-facts", "aggregate"));
    }

    #[test]
    fn loop_count_increments_per_check() {
        let mut r = RoutingController::default();
        assert_eq!(r.loop_count("extract-facts"), 0);
        assert_eq!(r.increment("extract-facts"), 1);
        assert_eq!(r.increment("extract-facts"), 2);
        assert_eq!(r.loop_count("other"), 0);
    }
}
