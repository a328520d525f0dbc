//! Branch identity: the forEach path a WorkItem runs under (§4.6.1).

use serde::{Deserialize, Serialize};

/// One `(ancestorId, iterationIndex)` hop contributed by a forEach ancestor.
/// A non-forEach parent contributes no element, so two dependents of the
/// same forEach check naturally share a branch prefix by iteration index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchPath(pub Vec<(String, usize)>);

impl BranchPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Extend this branch with one more forEach hop.
    pub fn push(&self, ancestor_id: &str, iteration_index: usize) -> Self {
        let mut v = self.0.clone();
        v.push((ancestor_id.to_string(), iteration_index));
        Self(v)
    }

    /// The iteration index contributed by `ancestor_id`, if this branch
    /// passed through it.
    pub fn index_for(&self, ancestor_id: &str) -> Option<usize> {
        self.0.iter().find(|(id, _)| id == ancestor_id).map(|(_, idx)| *idx)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// A human-readable label such as `list-issues[2]` used in log spans and
    /// test assertions (`categorize:ITEM_k`).
    pub fn label(&self) -> String {
        self.0
            .iter()
            .map(|(id, idx)| format!("{id}[{idx}]"))
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_prefix_shares_iteration_index() {
        let root = BranchPath::root();
        let b1 = root.push("list-issues", 2);
        let b2 = b1.push("categorize", 0);
        assert_eq!(b2.index_for("list-issues"), Some(2));
        assert_eq!(b1.0, b2.0[..1]);
    }

    #[test]
    fn root_branch_is_empty() {
        assert!(BranchPath::root().is_root());
    }
}
