//! Memory store configuration (§6): `storage`, optional snapshot file, and
//! format.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryStorage {
    Memory,
    File,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::Memory
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryFormat {
    Json,
    Csv,
}

impl Default for MemoryFormat {
    fn default() -> Self {
        Self::Json
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub storage: MemoryStorage,
    pub file: Option<PathBuf>,
    pub format: MemoryFormat,
    pub namespace: Option<String>,
    pub auto_load: bool,
    pub auto_save: bool,
}
