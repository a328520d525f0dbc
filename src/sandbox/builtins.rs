//! Whitelisted global functions and prototype methods (§4.1). Anything not
//! matched here is rejected with `ExprErrorKind::Forbidden` rather than
//! silently falling through to a general method-call mechanism — the
//! sandbox has no notion of "unknown method, try calling it anyway".

use std::time::Instant;

use serde_json::Value;

use super::ast::Expr;
use super::error::ExprError;
use super::scope::Scope;
use super::value_ext;

pub fn call_global(name: &str, args: &[Value]) -> Result<Value, ExprError> {
    match name {
        "always" => Ok(Value::Bool(true)),
        "contains" => Ok(Value::Bool(contains(args.first(), args.get(1)))),
        "startsWith" => {
            let s = arg_str(args, 0);
            let prefix = arg_str(args, 1);
            Ok(Value::Bool(s.starts_with(&prefix)))
        }
        "hasIssue" => {
            let issues = extract_issues(args.first().unwrap_or(&Value::Null));
            let filter = args.get(1).cloned().unwrap_or(Value::Null);
            Ok(Value::Bool(issues.iter().any(|i| issue_matches_filter(i, &filter))))
        }
        "hasFileMatching" => {
            let issues = extract_issues(args.first().unwrap_or(&Value::Null));
            let pattern = arg_str(args, 1);
            Ok(Value::Bool(issues.iter().any(|i| {
                i.get("file").and_then(|f| f.as_str()).map(|f| glob_match(&pattern, f)).unwrap_or(false)
            })))
        }
        other => Err(ExprError::forbidden(format!("'{other}' is not a permitted global function"))),
    }
}

fn contains(haystack: Option<&Value>, needle: Option<&Value>) -> bool {
    let needle = needle.cloned().unwrap_or(Value::Null);
    match haystack {
        Some(Value::String(s)) => s.contains(&value_ext::to_display_string(&needle)),
        Some(Value::Array(arr)) => arr.iter().any(|v| value_ext::loose_eq(v, &needle)),
        _ => false,
    }
}

fn extract_issues(v: &Value) -> Vec<&Value> {
    match v {
        Value::Array(arr) => arr.iter().collect(),
        Value::Object(map) => map
            .get("issues")
            .and_then(|i| i.as_array())
            .map(|a| a.iter().collect())
            .unwrap_or_default(),
        _ => vec![],
    }
}

fn issue_matches_filter(issue: &Value, filter: &Value) -> bool {
    match filter {
        Value::Object(f) => f
            .iter()
            .all(|(k, want)| issue.get(k).map(|got| value_ext::loose_eq(got, want)).unwrap_or(false)),
        _ => true,
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let mut regex_str = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => regex_str.push_str(".*"),
            '?' => regex_str.push('.'),
            c => regex_str.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex_str.push('$');
    regex::Regex::new(&regex_str).map(|re| re.is_match(text)).unwrap_or(false)
}

fn arg_str(args: &[Value], idx: usize) -> String {
    args.get(idx).map(value_ext::to_display_string).unwrap_or_default()
}

fn normalize_index(n: f64, len: i64) -> i64 {
    let n = n as i64;
    let idx = if n < 0 { (len + n).max(0) } else { n };
    idx.min(len)
}

pub fn call_prototype_method(method: &str, base: &Value, args: &[Value]) -> Result<Value, ExprError> {
    match base {
        Value::String(s) => string_method(method, s, args),
        Value::Array(arr) => array_method(method, arr, args),
        other => Err(ExprError::forbidden(format!("no method '{method}' on {other:?}"))),
    }
}

fn string_method(method: &str, s: &str, args: &[Value]) -> Result<Value, ExprError> {
    match method {
        "toLowerCase" => Ok(Value::String(s.to_lowercase())),
        "toUpperCase" => Ok(Value::String(s.to_uppercase())),
        "includes" => Ok(Value::Bool(s.contains(&arg_str(args, 0)))),
        "indexOf" => Ok(value_ext::number_value(
            s.find(&arg_str(args, 0)).map(|i| s[..i].chars().count() as f64).unwrap_or(-1.0),
        )),
        "startsWith" => Ok(Value::Bool(s.starts_with(&arg_str(args, 0)))),
        "endsWith" => Ok(Value::Bool(s.ends_with(&arg_str(args, 0)))),
        "trim" => Ok(Value::String(s.trim().to_string())),
        "slice" | "substring" => Ok(Value::String(slice_str(s, args))),
        "split" => {
            let sep = arg_str(args, 0);
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep.as_str()).map(|p| Value::String(p.to_string())).collect()
            };
            Ok(Value::Array(parts))
        }
        "replace" => Ok(Value::String(s.replacen(&arg_str(args, 0), &arg_str(args, 1), 1))),
        "match" => match regex::Regex::new(&arg_str(args, 0)) {
            Ok(re) => Ok(Value::Bool(re.is_match(s))),
            Err(_) => Ok(Value::Bool(false)),
        },
        other => Err(ExprError::forbidden(format!("string method '{other}' is not permitted"))),
    }
}

fn slice_str(s: &str, args: &[Value]) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let start = args.first().map(value_ext::to_number).map(|n| normalize_index(n, len)).unwrap_or(0);
    let end = args.get(1).map(value_ext::to_number).map(|n| normalize_index(n, len)).unwrap_or(len);
    if start >= end {
        return String::new();
    }
    chars[start as usize..end as usize].iter().collect()
}

fn array_method(method: &str, arr: &[Value], args: &[Value]) -> Result<Value, ExprError> {
    match method {
        "includes" => Ok(Value::Bool(
            arr.iter().any(|v| value_ext::loose_eq(v, args.first().unwrap_or(&Value::Null))),
        )),
        "indexOf" => Ok(value_ext::number_value(
            arr.iter()
                .position(|v| value_ext::loose_eq(v, args.first().unwrap_or(&Value::Null)))
                .map(|i| i as f64)
                .unwrap_or(-1.0),
        )),
        "slice" => {
            let len = arr.len() as i64;
            let start = args.first().map(value_ext::to_number).map(|n| normalize_index(n, len)).unwrap_or(0);
            let end = args.get(1).map(value_ext::to_number).map(|n| normalize_index(n, len)).unwrap_or(len);
            if start >= end {
                return Ok(Value::Array(vec![]));
            }
            Ok(Value::Array(arr[start as usize..end as usize].to_vec()))
        }
        "concat" => {
            let mut result = arr.to_vec();
            for a in args {
                match a {
                    Value::Array(other) => result.extend(other.clone()),
                    other => result.push(other.clone()),
                }
            }
            Ok(Value::Array(result))
        }
        "join" => {
            let sep = args.first().map(value_ext::to_display_string).unwrap_or_else(|| ",".to_string());
            Ok(Value::String(arr.iter().map(value_ext::to_display_string).collect::<Vec<_>>().join(&sep)))
        }
        // Values in this language are immutable snapshots, so `push` returns
        // the extended array rather than mutating the binding in place.
        "push" => {
            let mut result = arr.to_vec();
            result.extend(args.iter().cloned());
            Ok(Value::Array(result))
        }
        other => Err(ExprError::forbidden(format!("array method '{other}' is not permitted"))),
    }
}

pub fn call_hof_method(
    method: &str,
    base: &Value,
    params: &[String],
    body: &Expr,
    scope: &Scope,
    deadline: Instant,
) -> Result<Value, ExprError> {
    let arr = match base {
        Value::Array(a) => a.clone(),
        other => return Err(ExprError::runtime(format!("'{method}' can only be called on arrays, found {other:?}"))),
    };
    let bind = |item: &Value, index: usize| {
        scope.push_frame();
        if let Some(p0) = params.first() {
            scope.bind_local(p0, item.clone());
        }
        if let Some(p1) = params.get(1) {
            scope.bind_local(p1, value_ext::number_value(index as f64));
        }
    };
    match method {
        "some" => {
            for (i, item) in arr.iter().enumerate() {
                bind(item, i);
                let r = super::eval_expr(body, scope, deadline);
                scope.pop_frame();
                if value_ext::truthy(&r?) {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "every" => {
            for (i, item) in arr.iter().enumerate() {
                bind(item, i);
                let r = super::eval_expr(body, scope, deadline);
                scope.pop_frame();
                if !value_ext::truthy(&r?) {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        "filter" => {
            let mut out = Vec::new();
            for (i, item) in arr.iter().enumerate() {
                bind(item, i);
                let r = super::eval_expr(body, scope, deadline);
                scope.pop_frame();
                if value_ext::truthy(&r?) {
                    out.push(item.clone());
                }
            }
            Ok(Value::Array(out))
        }
        "map" => {
            let mut out = Vec::with_capacity(arr.len());
            for (i, item) in arr.iter().enumerate() {
                bind(item, i);
                let r = super::eval_expr(body, scope, deadline);
                scope.pop_frame();
                out.push(r?);
            }
            Ok(Value::Array(out))
        }
        "find" => {
            for (i, item) in arr.iter().enumerate() {
                bind(item, i);
                let r = super::eval_expr(body, scope, deadline);
                scope.pop_frame();
                if value_ext::truthy(&r?) {
                    return Ok(item.clone());
                }
            }
            Ok(Value::Null)
        }
        other => Err(ExprError::forbidden(format!("'{other}' is not a permitted array method"))),
    }
}

pub fn call_reduce(
    base: Value,
    params: &[String],
    body: &Expr,
    init: Option<Value>,
    scope: &Scope,
    deadline: Instant,
) -> Result<Value, ExprError> {
    let arr = match base {
        Value::Array(a) => a,
        other => return Err(ExprError::runtime(format!("reduce can only be called on arrays, found {other:?}"))),
    };
    let mut iter = arr.into_iter();
    let mut acc = match init {
        Some(v) => v,
        None => iter
            .next()
            .ok_or_else(|| ExprError::runtime("reduce of empty array with no initial value"))?,
    };
    for (i, item) in iter.enumerate() {
        scope.push_frame();
        if let Some(p0) = params.first() {
            scope.bind_local(p0, acc.clone());
        }
        if let Some(p1) = params.get(1) {
            scope.bind_local(p1, item.clone());
        }
        if let Some(p2) = params.get(2) {
            scope.bind_local(p2, value_ext::number_value(i as f64));
        }
        let r = super::eval_expr(body, scope, deadline);
        scope.pop_frame();
        acc = r?;
    }
    Ok(acc)
}

/// `memory.get/has/set/append/increment/delete/clear(...)` (§4.3). Writes
/// are buffered on the scope and committed by the caller after evaluation.
pub fn call_memory_method(method: &str, args: &[Value], scope: &Scope) -> Result<Value, ExprError> {
    let key_of = |i: usize| args.get(i).map(value_ext::to_display_string).unwrap_or_default();
    let ns_of = |i: usize| args.get(i).and_then(|v| v.as_str()).map(str::to_string);
    match method {
        "get" => Ok(scope.memory_get(&key_of(0), ns_of(1).as_deref())),
        "has" => Ok(Value::Bool(scope.memory_has(&key_of(0), ns_of(1).as_deref()))),
        "set" => {
            let value = args.get(1).cloned().unwrap_or(Value::Null);
            scope.memory_set(&key_of(0), value, ns_of(2).as_deref());
            Ok(Value::Null)
        }
        "append" => {
            let value = args.get(1).cloned().unwrap_or(Value::Null);
            scope.memory_append(&key_of(0), value, ns_of(2).as_deref());
            Ok(Value::Null)
        }
        "increment" => {
            let amount = args.get(1).map(value_ext::to_number);
            scope.memory_increment(&key_of(0), amount, ns_of(2).as_deref());
            Ok(Value::Null)
        }
        "delete" => {
            scope.memory_delete(&key_of(0), ns_of(1).as_deref());
            Ok(Value::Null)
        }
        "clear" => {
            scope.memory_clear(ns_of(0).as_deref());
            Ok(Value::Null)
        }
        other => Err(ExprError::forbidden(format!("'memory.{other}' is not a permitted method"))),
    }
}
