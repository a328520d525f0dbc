//! YAML loading with `${{ env.NAME }}` / `${NAME}` process-env expansion
//! (§4.9, §6), applied as a text pre-pass before `serde_yaml::from_str` the
//! same way the teacher's `config.rs` substitutes before typed
//! deserialization.

use std::path::Path;

use regex::Regex;

use super::Config;
use crate::error::VisorError;

fn env_pattern() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}|\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap())
}

/// Replace every `${{ env.NAME }}` or `${NAME}` reference with the process
/// environment variable of the same name, leaving unresolved references as
/// an empty string (consistent with the template engine's
/// `strict_variables=false` default, §4.2).
pub fn expand_env_refs(text: &str) -> String {
    env_pattern()
        .replace_all(text, |caps: &regex::Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");
            std::env::var(name).unwrap_or_default()
        })
        .into_owned()
}

pub fn load_str(yaml: &str) -> Result<Config, VisorError> {
    let expanded = expand_env_refs(yaml);
    let mut config: Config = serde_yaml::from_str(&expanded).map_err(|e| VisorError::Config {
        kind: "parse".to_string(),
        message: e.to_string(),
    })?;
    for (id, check) in config.checks.iter_mut() {
        check.id = id.clone();
    }
    config.validate()?;
    Ok(config)
}

pub fn load_file(path: &Path) -> Result<Config, VisorError> {
    let raw = std::fs::read_to_string(path).map_err(|e| VisorError::Config {
        kind: "io".to_string(),
        message: format!("reading {}: {e}", path.display()),
    })?;
    load_str(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn expands_both_env_syntaxes() {
        std::env::set_var("VISOR_TEST_TOKEN", "secret123");
        let text = "a: ${{ env.VISOR_TEST_TOKEN }}\nb: ${VISOR_TEST_TOKEN}";
        let expanded = expand_env_refs(text);
        assert_eq!(expanded, "a: secret123\nb: secret123");
        std::env::remove_var("VISOR_TEST_TOKEN");
    }

    #[test]
    #[serial]
    fn unresolved_reference_becomes_empty() {
        std::env::remove_var("VISOR_TEST_MISSING_XYZ");
        let expanded = expand_env_refs("x: ${VISOR_TEST_MISSING_XYZ}");
        assert_eq!(expanded, "x: ");
    }

    #[test]
    fn loads_minimal_config() {
        let yaml = r#"
version: "1.0"
max_parallelism: 2
checks:
  hello:
    type: noop
    on: pr_opened
"#;
        let config = load_str(yaml).unwrap();
        assert_eq!(config.max_parallelism, 2);
        assert_eq!(config.checks["hello"].id, "hello");
        assert_eq!(config.checks["hello"].on, vec![crate::domain::TriggerEvent::PrOpened]);
    }
}
