//! Rendering engine for provider parameter templates (§4.2): conditionals,
//! loops, and variable assignment come for free from Handlebars' block
//! helpers (`#if`, `#each`, ...); the fixed filter set is layered on top in
//! [`super::filters`].

use std::path::PathBuf;

use handlebars::Handlebars;
use serde_json::Value;

use super::error::TemplateError;
use super::filters::{register_pure_filters, ReadFileHelper};

pub struct TemplateEngine {
    hbs: Handlebars<'static>,
}

impl TemplateEngine {
    /// `project_root` bounds `readfile` lookups (§4.2: "constrained to the
    /// project root; path traversal rejected").
    pub fn new(project_root: PathBuf) -> Self {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(false);
        register_pure_filters(&mut hbs);
        hbs.register_helper("readfile", Box::new(ReadFileHelper { project_root }));
        Self { hbs }
    }

    pub fn render(&self, template: &str, scope: &Value) -> Result<String, TemplateError> {
        Ok(self.hbs.render_template(template, scope)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> TemplateEngine {
        TemplateEngine::new(std::env::temp_dir())
    }

    #[test]
    fn renders_plain_variables_with_lenient_missing_keys() {
        let e = engine();
        let out = e.render("hello {{name}}, missing={{nope}}", &json!({ "name": "world" })).unwrap();
        assert_eq!(out, "hello world, missing=");
    }

    #[test]
    fn supports_conditionals_and_loops() {
        let e = engine();
        let tpl = "{{#if flagged}}FLAGGED{{/if}} items:{{#each items}} {{this}}{{/each}}";
        let out = e.render(tpl, &json!({ "flagged": true, "items": ["a", "b"] })).unwrap();
        assert_eq!(out, "FLAGGED items: a b");
    }

    #[test]
    fn applies_to_json_and_safe_label_filters() {
        let e = engine();
        let out = e
            .render("{{safe_label title}}", &json!({ "title": "Needs Review!!" }))
            .unwrap();
        assert_eq!(out, "needs-review");
    }

    #[test]
    fn parse_json_then_to_json_round_trips() {
        let e = engine();
        let out = e
            .render("{{to_json (parse_json raw)}}", &json!({ "raw": "{\"a\":1}" }))
            .unwrap();
        assert_eq!(out, "{\"a\":1}");
    }

    #[test]
    fn readfile_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inside.txt"), "secret-sibling").unwrap();
        let e = TemplateEngine::new(dir.path().to_path_buf());
        let err = e.render("{{readfile \"../outside.txt\"}}", &json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
    }

    #[test]
    fn readfile_reads_within_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello from disk").unwrap();
        let e = TemplateEngine::new(dir.path().to_path_buf());
        let out = e.render("{{readfile \"notes.txt\"}}", &json!({})).unwrap();
        assert_eq!(out, "hello from disk");
    }
}
