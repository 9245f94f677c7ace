// Configuration surface
// Opaque constants selecting which remote document and folder to read.
// These are deployment configuration, never user input.

use crate::filter::ContractMatchMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source selection for one deployment of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Key of the remote spreadsheet document to load.
    pub spreadsheet_key: String,
    /// Folder scanned for the files CLC documents link to.
    pub linked_folder_id: String,
    /// Contract filter semantics for this deployment (exact for dropdown
    /// variants, substring for free-text search variants).
    pub contract_match: ContractMatchMode,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            spreadsheet_key: String::new(),
            linked_folder_id: String::new(),
            contract_match: ContractMatchMode::Exact,
        }
    }
}

impl SourceConfig {
    /// Read configuration from a JSON file. Unknown fields are ignored,
    /// missing fields fall back to defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SourceConfig> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
