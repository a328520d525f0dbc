//! The fixed filter set the template engine exposes (§4.2). Registered as
//! Handlebars helpers and invoked as subexpressions, e.g.
//! `{{safe_label (to_json outputs.lint)}}`.

use std::path::PathBuf;

use handlebars::{handlebars_helper, Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderErrorReason};

handlebars_helper!(parse_json: |s: str| {
    serde_json::from_str::<serde_json::Value>(s).unwrap_or(serde_json::Value::Null)
});

handlebars_helper!(to_json: |v: Json| {
    serde_json::to_string(v).unwrap_or_default()
});

handlebars_helper!(unescape_newlines: |s: str| {
    s.replace("\\n", "\n").replace("\\t", "\t")
});

handlebars_helper!(safe_label: |s: str| {
    sanitize_label(s)
});

handlebars_helper!(safe_label_list: |v: Json| {
    v.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str())
                .map(sanitize_label)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
});

/// GitHub-label-safe form: lowercase, spaces/underscores collapsed to
/// single hyphens, anything outside `[a-z0-9-]` dropped.
fn sanitize_label(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_sep = false;
    for c in s.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep && !out.is_empty() {
            out.push('-');
            last_was_sep = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// `{{readfile "path/relative/to/project/root.txt"}}`. Rejects any
/// resolved path that escapes the configured project root.
pub struct ReadFileHelper {
    pub project_root: PathBuf,
}

impl HelperDef for ReadFileHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let rel_path = h
            .param(0)
            .and_then(|v| v.value().as_str())
            .ok_or_else(|| RenderErrorReason::Other("readfile requires a string path argument".to_string()))?;

        let candidate = self.project_root.join(rel_path);
        let canonical_root = self
            .project_root
            .canonicalize()
            .map_err(|e| RenderErrorReason::Other(format!("readfile: project root unavailable: {e}")))?;
        let canonical_path = candidate
            .canonicalize()
            .map_err(|e| RenderErrorReason::Other(format!("readfile: {e}")))?;

        if !canonical_path.starts_with(&canonical_root) {
            return Err(RenderErrorReason::Other(format!("readfile: '{rel_path}' escapes the project root")).into());
        }

        let content = std::fs::read_to_string(&canonical_path)
            .map_err(|e| RenderErrorReason::Other(format!("readfile: {e}")))?;
        out.write(&content)?;
        Ok(())
    }
}

pub fn register_pure_filters(hbs: &mut Handlebars) {
    hbs.register_helper("parse_json", Box::new(parse_json));
    hbs.register_helper("to_json", Box::new(to_json));
    hbs.register_helper("unescape_newlines", Box::new(unescape_newlines));
    hbs.register_helper("safe_label", Box::new(safe_label));
    hbs.register_helper("safe_label_list", Box::new(safe_label_list));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_label_collapses_separators() {
        assert_eq!(sanitize_label("Needs Review!!"), "needs-review");
        assert_eq!(sanitize_label("already-ok"), "already-ok");
    }
}
