//! serde helpers normalizing the YAML's string-vs-array variant fields
//! (`depends_on`, `on`) the way the teacher normalizes its own optional
//! scalar/list YAML fields.

use serde::{Deserialize, Deserializer};

use super::dependency::DependencyToken;
use crate::domain::TriggerEvent;

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(v: OneOrMany<T>) -> Self {
        match v {
            OneOrMany::One(t) => vec![t],
            OneOrMany::Many(v) => v,
        }
    }
}

pub fn depends_on<'de, D>(deserializer: D) -> Result<Vec<DependencyToken>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<OneOrMany<String>> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(Vec::<String>::from)
        .unwrap_or_default()
        .iter()
        .map(|s| DependencyToken::parse(s))
        .collect())
}

pub fn on_events<'de, D>(deserializer: D) -> Result<Vec<TriggerEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<OneOrMany<String>> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(Vec::<String>::from)
        .unwrap_or_default()
        .iter()
        .map(|s| s.parse().unwrap())
        .collect())
}

pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<OneOrMany<String>> = Option::deserialize(deserializer)?;
    Ok(raw.map(Vec::<String>::from).unwrap_or_default())
}
