//! Evaluation scope exposed to sandboxed expressions/scripts (§4.1, §4.6.6).
//!
//! A [`Scope`] is rebuilt for every check invocation. It exposes the global
//! bindings the spec grants expressions (`outputs`, `outputsHistory`,
//! `memory`, `event`) plus a stack of local frames used for arrow-function
//! parameters and `const`/`let` bindings inside `evaluateScript` bodies. A
//! forEach dependent's per-iteration element is not a separate global: it
//! lives at `outputs[checkId]` like any other dependency output (§4.6.2),
//! keyed by the forEach ancestor's check id — the scheduler resolves that
//! slice before the scope is built. `forEach`, `step`, `attempt`, and `loop`
//! are reserved instead for the `onFinish` wave-stats scope (§4.6.6) and are
//! only bound via [`Scope::with_on_finish`].

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use super::memory_write::MemoryWrite;
use crate::domain::HistoryMap;

/// The §4.6.6-only identifiers bound while evaluating an `onFinish`
/// `goto_js`/`run_js` for a drained forEach wave.
struct OnFinishBindings {
    for_each: Value,
    step: Value,
    attempt: Value,
    loop_idx: Value,
}

pub struct Scope<'a> {
    outputs: Value,
    outputs_history: &'a HistoryMap,
    on_finish: Option<OnFinishBindings>,
    event: String,
    memory_snapshot: HashMap<String, HashMap<String, Value>>,
    default_namespace: String,
    pending_writes: RefCell<Vec<MemoryWrite>>,
    locals: RefCell<Vec<HashMap<String, Value>>>,
    /// The current check's own just-produced output, bound as `output` —
    /// used by `fail_if`/`failure_conditions`/`transform_js` (§4.6.4),
    /// distinct from `outputs`, the dependency-outputs map.
    own_output: Value,
}

impl<'a> Scope<'a> {
    pub fn new(
        outputs: Value,
        outputs_history: &'a HistoryMap,
        event: impl Into<String>,
        memory_snapshot: HashMap<String, HashMap<String, Value>>,
        default_namespace: impl Into<String>,
    ) -> Self {
        Self {
            outputs,
            outputs_history,
            on_finish: None,
            event: event.into(),
            memory_snapshot,
            default_namespace: default_namespace.into(),
            pending_writes: RefCell::new(Vec::new()),
            locals: RefCell::new(Vec::new()),
            own_output: Value::Null,
        }
    }

    /// Binds `output` to the check's own just-produced value, for
    /// evaluating `fail_if`/`failure_conditions`/`transform_js` against the
    /// result that just came back from the provider.
    pub fn with_own_output(mut self, output: Value) -> Self {
        self.own_output = output;
        self
    }

    /// Binds the §4.6.6 `onFinish`-only identifiers: `forEach` as the
    /// `{total, successful, failed, items, last_wave_size}` wave-stats
    /// object (not a per-iteration element), `step` as `{id, tags, group}`
    /// for the forEach check itself, plus `attempt` and `loop`.
    pub fn with_on_finish(mut self, for_each: Value, step: Value, attempt: Value, loop_idx: Value) -> Self {
        self.on_finish = Some(OnFinishBindings { for_each, step, attempt, loop_idx });
        self
    }

    pub fn push_frame(&self) {
        self.locals.borrow_mut().push(HashMap::new());
    }

    pub fn pop_frame(&self) {
        self.locals.borrow_mut().pop();
    }

    pub fn bind_local(&self, name: &str, value: Value) {
        if let Some(frame) = self.locals.borrow_mut().last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    fn lookup_local(&self, name: &str) -> Option<Value> {
        for frame in self.locals.borrow().iter().rev() {
            if let Some(v) = frame.get(name) {
                return Some(v.clone());
            }
        }
        None
    }

    fn ns(&self, namespace: Option<&str>) -> String {
        namespace.unwrap_or(&self.default_namespace).to_string()
    }

    pub fn memory_get(&self, key: &str, namespace: Option<&str>) -> Value {
        self.memory_snapshot
            .get(&self.ns(namespace))
            .and_then(|m| m.get(key))
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn memory_has(&self, key: &str, namespace: Option<&str>) -> bool {
        self.memory_snapshot
            .get(&self.ns(namespace))
            .map(|m| m.contains_key(key))
            .unwrap_or(false)
    }

    pub fn memory_set(&self, key: &str, value: Value, namespace: Option<&str>) {
        self.pending_writes.borrow_mut().push(MemoryWrite::Set {
            key: key.to_string(),
            value,
            namespace: namespace.map(str::to_string),
        });
    }

    pub fn memory_append(&self, key: &str, value: Value, namespace: Option<&str>) {
        self.pending_writes.borrow_mut().push(MemoryWrite::Append {
            key: key.to_string(),
            value,
            namespace: namespace.map(str::to_string),
        });
    }

    pub fn memory_increment(&self, key: &str, amount: Option<f64>, namespace: Option<&str>) {
        self.pending_writes.borrow_mut().push(MemoryWrite::Increment {
            key: key.to_string(),
            amount,
            namespace: namespace.map(str::to_string),
        });
    }

    pub fn memory_delete(&self, key: &str, namespace: Option<&str>) {
        self.pending_writes.borrow_mut().push(MemoryWrite::Delete {
            key: key.to_string(),
            namespace: namespace.map(str::to_string),
        });
    }

    pub fn memory_clear(&self, namespace: Option<&str>) {
        self.pending_writes
            .borrow_mut()
            .push(MemoryWrite::Clear { namespace: namespace.map(str::to_string) });
    }

    pub fn take_pending_writes(&self) -> Vec<MemoryWrite> {
        std::mem::take(&mut self.pending_writes.borrow_mut())
    }

    /// Resolves a top-level identifier: locals first, then the fixed global
    /// bindings the spec grants expressions.
    pub fn resolve_ident(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.lookup_local(name) {
            return Some(v);
        }
        match name {
            "outputs" => Some(self.outputs.clone()),
            "output" => Some(self.own_output.clone()),
            "outputsHistory" | "outputs_history" => Some(self.history_as_value()),
            "forEach" => Some(self.on_finish.as_ref().map(|o| o.for_each.clone()).unwrap_or(Value::Null)),
            "step" => Some(self.on_finish.as_ref().map(|o| o.step.clone()).unwrap_or(Value::Null)),
            "attempt" => Some(self.on_finish.as_ref().map(|o| o.attempt.clone()).unwrap_or(Value::Null)),
            "loop" => Some(self.on_finish.as_ref().map(|o| o.loop_idx.clone()).unwrap_or(Value::Null)),
            "event" => Some(Value::String(self.event.clone())),
            "memory" => Some(Value::String("__memory_capability__".to_string())),
            _ => None,
        }
    }

    fn history_as_value(&self) -> Value {
        let mut obj = serde_json::Map::new();
        for (check_id, entries) in self.outputs_history.0.iter() {
            let arr: Vec<Value> = entries.iter().map(|e| e.value.clone()).collect();
            obj.insert(check_id.clone(), Value::Array(arr));
        }
        Value::Object(obj)
    }

    pub fn is_memory_capability(&self, value: &Value) -> bool {
        matches!(value, Value::String(s) if s == "__memory_capability__")
    }
}
