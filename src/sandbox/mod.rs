//! Expression Sandbox (§4.1): a restricted, JS-flavored expression language
//! used for `if`, `fail_if`, `failure_conditions[].condition`, `goto_js`,
//! `transform_js`, `value_js`, and `memory_js`, plus a small statement
//! superset (`return`, `log()`, local bindings) for `evaluateScript`
//! contexts. Deliberately hand-rolled: the grammar is small and closed
//! (no dynamic code loading, no user-defined functions, no imports), which
//! doesn't map onto any scripting-engine crate in the existing dependency
//! stack.

mod ast;
mod builtins;
mod error;
mod lexer;
mod memory_write;
mod parser;
mod scope;
mod value_ext;

pub use error::{ExprError, ExprErrorKind};
pub use memory_write::MemoryWrite;
pub use scope::Scope;

use std::time::{Duration, Instant};

use serde_json::Value;

use ast::{BinaryOp, Expr, LogicalOp, MemberKey, Stmt, UnaryOp};

/// Default wall-clock budget for a single `evaluate`/`evaluate_script` call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);

/// JS-style truthiness for a value already produced by the sandbox (used by
/// the scheduler to interpret `if`/`fail_if` results without re-exporting
/// the whole `value_ext` coercion surface).
pub fn is_truthy(value: &Value) -> bool {
    value_ext::truthy(value)
}

pub struct Sandbox {
    timeout: Duration,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT }
    }
}

impl Sandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Evaluates a single expression (`if`, `fail_if`, `goto_js`, ...).
    pub fn evaluate(&self, source: &str, scope: &Scope) -> Result<Value, ExprError> {
        let expr = parser::parse_expr(source)?;
        let deadline = Instant::now() + self.timeout;
        scope.push_frame();
        let result = eval_expr(&expr, scope, deadline);
        scope.pop_frame();
        result
    }

    /// Evaluates an `evaluateScript` body: a short sequence of statements
    /// ending (optionally) in `return`. Without an explicit `return`, the
    /// value of the last expression statement is the result.
    pub fn evaluate_script(&self, source: &str, scope: &Scope) -> Result<Value, ExprError> {
        let stmts = parser::parse_script(source)?;
        let deadline = Instant::now() + self.timeout;
        scope.push_frame();
        let result = run_script(&stmts, scope, deadline);
        scope.pop_frame();
        result
    }
}

fn run_script(stmts: &[Stmt], scope: &Scope, deadline: Instant) -> Result<Value, ExprError> {
    let mut last = Value::Null;
    for stmt in stmts {
        check_deadline(deadline)?;
        match stmt {
            Stmt::Let { name, value } => {
                let v = eval_expr(value, scope, deadline)?;
                scope.bind_local(name, v);
            }
            Stmt::Return(expr) => {
                return match expr {
                    Some(e) => eval_expr(e, scope, deadline),
                    None => Ok(Value::Null),
                };
            }
            Stmt::Expr(e) => {
                last = eval_expr(e, scope, deadline)?;
            }
        }
    }
    Ok(last)
}

fn check_deadline(deadline: Instant) -> Result<(), ExprError> {
    if Instant::now() >= deadline {
        Err(ExprError::timeout("expression evaluation exceeded its time budget"))
    } else {
        Ok(())
    }
}

pub(crate) fn eval_expr(expr: &Expr, scope: &Scope, deadline: Instant) -> Result<Value, ExprError> {
    check_deadline(deadline)?;
    match expr {
        Expr::Number(n) => Ok(value_ext::number_value(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Ident(name) => scope
            .resolve_ident(name)
            .ok_or_else(|| ExprError::runtime(format!("'{name}' is not defined"))),
        Expr::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval_expr(item, scope, deadline)?);
            }
            Ok(Value::Array(out))
        }
        Expr::Object(fields) => {
            let mut map = serde_json::Map::with_capacity(fields.len());
            for (key, value) in fields {
                map.insert(key.clone(), eval_expr(value, scope, deadline)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Unary { op, expr } => {
            let v = eval_expr(expr, scope, deadline)?;
            Ok(match op {
                UnaryOp::Neg => value_ext::number_value(-value_ext::to_number(&v)),
                UnaryOp::Not => Value::Bool(!value_ext::truthy(&v)),
            })
        }
        Expr::Binary { op, left, right } => {
            let l = eval_expr(left, scope, deadline)?;
            let r = eval_expr(right, scope, deadline)?;
            eval_binary(*op, &l, &r)
        }
        Expr::Logical { op, left, right } => {
            let l = eval_expr(left, scope, deadline)?;
            match op {
                LogicalOp::And => {
                    if value_ext::truthy(&l) {
                        eval_expr(right, scope, deadline)
                    } else {
                        Ok(l)
                    }
                }
                LogicalOp::Or => {
                    if value_ext::truthy(&l) {
                        Ok(l)
                    } else {
                        eval_expr(right, scope, deadline)
                    }
                }
            }
        }
        Expr::Conditional { test, consequent, alternate } => {
            if value_ext::truthy(&eval_expr(test, scope, deadline)?) {
                eval_expr(consequent, scope, deadline)
            } else {
                eval_expr(alternate, scope, deadline)
            }
        }
        Expr::Member { object, property } => eval_member(object, property, scope, deadline),
        Expr::Call { callee, args } => eval_call(callee, args, scope, deadline),
        Expr::Arrow { .. } => Err(ExprError::forbidden(
            "arrow functions may only be used as the first argument to an array method",
        )),
    }
}

fn eval_binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, ExprError> {
    use std::cmp::Ordering;
    use BinaryOp::*;
    Ok(match op {
        Add => {
            if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
                Value::String(format!("{}{}", value_ext::to_display_string(l), value_ext::to_display_string(r)))
            } else {
                value_ext::number_value(value_ext::to_number(l) + value_ext::to_number(r))
            }
        }
        Sub => value_ext::number_value(value_ext::to_number(l) - value_ext::to_number(r)),
        Mul => value_ext::number_value(value_ext::to_number(l) * value_ext::to_number(r)),
        Div => value_ext::number_value(value_ext::to_number(l) / value_ext::to_number(r)),
        Mod => value_ext::number_value(value_ext::to_number(l) % value_ext::to_number(r)),
        Eq => Value::Bool(value_ext::loose_eq(l, r)),
        NotEq => Value::Bool(!value_ext::loose_eq(l, r)),
        StrictEq => Value::Bool(l == r),
        StrictNotEq => Value::Bool(l != r),
        Lt => Value::Bool(matches!(compare(l, r), Some(Ordering::Less))),
        Lte => Value::Bool(matches!(compare(l, r), Some(Ordering::Less | Ordering::Equal))),
        Gt => Value::Bool(matches!(compare(l, r), Some(Ordering::Greater))),
        Gte => Value::Bool(matches!(compare(l, r), Some(Ordering::Greater | Ordering::Equal))),
    })
}

fn compare(l: &Value, r: &Value) -> Option<std::cmp::Ordering> {
    if let (Value::String(a), Value::String(b)) = (l, r) {
        return Some(a.cmp(b));
    }
    value_ext::to_number(l).partial_cmp(&value_ext::to_number(r))
}

fn eval_member(object: &Expr, property: &MemberKey, scope: &Scope, deadline: Instant) -> Result<Value, ExprError> {
    let base = eval_expr(object, scope, deadline)?;
    if scope.is_memory_capability(&base) {
        return Err(ExprError::forbidden("the 'memory' binding can only be used through its methods"));
    }
    let key = match property {
        MemberKey::Static(s) => s.clone(),
        MemberKey::Computed(e) => {
            let idx = eval_expr(e, scope, deadline)?;
            if let Value::Array(arr) = &base {
                let n = value_ext::to_number(&idx);
                if n.is_finite() && n >= 0.0 {
                    return Ok(arr.get(n as usize).cloned().unwrap_or(Value::Null));
                }
                return Ok(Value::Null);
            }
            value_ext::to_display_string(&idx)
        }
    };
    match &base {
        Value::Object(map) => Ok(map.get(&key).cloned().unwrap_or(Value::Null)),
        Value::Array(arr) => {
            if key == "length" {
                Ok(value_ext::number_value(arr.len() as f64))
            } else if let Ok(idx) = key.parse::<usize>() {
                Ok(arr.get(idx).cloned().unwrap_or(Value::Null))
            } else {
                Ok(Value::Null)
            }
        }
        Value::String(s) => {
            if key == "length" {
                Ok(value_ext::number_value(s.chars().count() as f64))
            } else if let Ok(idx) = key.parse::<usize>() {
                Ok(s.chars().nth(idx).map(|c| Value::String(c.to_string())).unwrap_or(Value::Null))
            } else {
                Ok(Value::Null)
            }
        }
        Value::Null => Err(ExprError::runtime(format!("cannot read property '{key}' of null"))),
        other => Err(ExprError::runtime(format!("cannot read property '{key}' of {other:?}"))),
    }
}

fn eval_call(callee: &Expr, args: &[Expr], scope: &Scope, deadline: Instant) -> Result<Value, ExprError> {
    if let Expr::Member { object, property } = callee {
        if let Expr::Ident(name) = object.as_ref() {
            if name == "memory" {
                let method = static_key(property)?;
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(eval_expr(a, scope, deadline)?);
                }
                return builtins::call_memory_method(method, &values, scope);
            }
        }
        let method = static_key(property)?;
        if let Some(Expr::Arrow { params, body }) = args.first() {
            let base = eval_expr(object, scope, deadline)?;
            if method == "reduce" {
                let init = match args.get(1) {
                    Some(e) => Some(eval_expr(e, scope, deadline)?),
                    None => None,
                };
                return builtins::call_reduce(base, params, body, init, scope, deadline);
            }
            return builtins::call_hof_method(method, &base, params, body, scope, deadline);
        }
        let base = eval_expr(object, scope, deadline)?;
        let mut values = Vec::with_capacity(args.len());
        for a in args {
            values.push(eval_expr(a, scope, deadline)?);
        }
        return builtins::call_prototype_method(method, &base, &values);
    }
    if let Expr::Ident(name) = callee {
        if name == "log" {
            // evaluateScript's `log()`: evaluated for side effect (traced
            // by the caller through `tracing`), contributes Null to the
            // expression it's used in.
            for a in args {
                eval_expr(a, scope, deadline)?;
            }
            return Ok(Value::Null);
        }
        let mut values = Vec::with_capacity(args.len());
        for a in args {
            values.push(eval_expr(a, scope, deadline)?);
        }
        return builtins::call_global(name, &values);
    }
    Err(ExprError::forbidden("calls are only allowed on whitelisted globals and prototype methods"))
}

fn static_key(property: &MemberKey) -> Result<&str, ExprError> {
    match property {
        MemberKey::Static(s) => Ok(s.as_str()),
        MemberKey::Computed(_) => Err(ExprError::forbidden("computed member calls are not permitted")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HistoryMap;
    use std::collections::HashMap;

    fn scope(outputs: Value) -> (HistoryMap, Scope<'static>) {
        // leaked for test convenience; `'static` avoids the test needing to
        // thread lifetimes through one-off assertions.
        let history: &'static HistoryMap = Box::leak(Box::new(HistoryMap::new()));
        let scope = Scope::new(outputs, history, "manual", HashMap::new(), "default");
        (HistoryMap::new(), scope)
    }

    #[test]
    fn evaluates_arithmetic_and_comparisons() {
        let (_h, scope) = scope(Value::Null);
        let sandbox = Sandbox::new();
        assert_eq!(sandbox.evaluate("1 + 2 * 3", &scope).unwrap(), value_ext::number_value(7.0));
        assert_eq!(sandbox.evaluate("(1 + 2) * 3 > 8", &scope).unwrap(), Value::Bool(true));
    }

    #[test]
    fn reads_outputs_and_member_chains() {
        let outputs = serde_json::json!({ "lint": { "issues": [{"severity": "error", "file": "a.rs"}] } });
        let (_h, scope) = scope(outputs);
        let sandbox = Sandbox::new();
        assert_eq!(
            sandbox.evaluate("outputs.lint.issues.length", &scope).unwrap(),
            value_ext::number_value(1.0)
        );
    }

    #[test]
    fn whitelisted_builtin_has_issue() {
        let outputs = serde_json::json!({ "lint": { "issues": [{"severity": "error"}] } });
        let (_h, scope) = scope(outputs);
        let sandbox = Sandbox::new();
        let result = sandbox
            .evaluate("hasIssue(outputs.lint, { severity: 'error' })", &scope)
            .unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn array_hof_filter_and_map_with_arrow() {
        let outputs = serde_json::json!({ "nums": [1, 2, 3, 4] });
        let (_h, scope) = scope(outputs);
        let sandbox = Sandbox::new();
        let result = sandbox
            .evaluate("outputs.nums.filter(n => n > 2).map(n => n * 10)", &scope)
            .unwrap();
        assert_eq!(result, serde_json::json!([30.0, 40.0]));
    }

    #[test]
    fn reduce_sums_with_initial_accumulator() {
        let outputs = serde_json::json!({ "nums": [1, 2, 3] });
        let (_h, scope) = scope(outputs);
        let sandbox = Sandbox::new();
        let result = sandbox.evaluate("outputs.nums.reduce((acc, n) => acc + n, 0)", &scope).unwrap();
        assert_eq!(result, value_ext::number_value(6.0));
    }

    #[test]
    fn forbidden_call_is_rejected() {
        let (_h, scope) = scope(Value::Null);
        let sandbox = Sandbox::new();
        let err = sandbox.evaluate("eval('1')", &scope).unwrap_err();
        assert_eq!(err.kind, ExprErrorKind::Forbidden);
    }

    #[test]
    fn evaluate_script_supports_locals_and_return() {
        let outputs = serde_json::json!({ "count": 5 });
        let (_h, scope) = scope(outputs);
        let sandbox = Sandbox::new();
        let result = sandbox
            .evaluate_script("const doubled = outputs.count * 2; return doubled + 1;", &scope)
            .unwrap();
        assert_eq!(result, value_ext::number_value(11.0));
    }

    #[test]
    fn undefined_identifier_is_a_runtime_error() {
        let (_h, scope) = scope(Value::Null);
        let sandbox = Sandbox::new();
        let err = sandbox.evaluate("doesNotExist + 1", &scope).unwrap_err();
        assert_eq!(err.kind, ExprErrorKind::Runtime);
    }
}
