//! Buffered memory mutations recorded by the sandbox's `memory` capability
//! object during expression/script evaluation. §4.3/§5: writes made from
//! inside a provider's sandboxed expressions are buffered and committed to
//! the real [`crate::memory::MemoryStore`] once per provider invocation via
//! `MemoryStore::commit_batch`, rather than mutating the shared store live
//! while an expression is still running.

use serde_json::Value;

#[derive(Debug, Clone)]
pub enum MemoryWrite {
    Set {
        key: String,
        value: Value,
        namespace: Option<String>,
    },
    Append {
        key: String,
        value: Value,
        namespace: Option<String>,
    },
    Increment {
        key: String,
        amount: Option<f64>,
        namespace: Option<String>,
    },
    Delete {
        key: String,
        namespace: Option<String>,
    },
    Clear {
        namespace: Option<String>,
    },
}
