//! Engine configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Options controlling how queries are parsed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Extra characters allowed in identifiers, e.g. `$` or `#`
    pub additional_identifier_chars: String,
    /// Split FROM into tables, aliases and joins. When off, the FROM text is
    /// handed to the source as one opaque locator.
    pub parse_from: bool,
    /// Parse and evaluate WHERE. When off, the condition text is only passed
    /// through to the source.
    pub parse_where: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            additional_identifier_chars: String::new(),
            parse_from: true,
            parse_where: true,
        }
    }
}

impl EngineConfig {
    /// Loads a configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
