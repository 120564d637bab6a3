//! Locator alias database.
//!
//! Maps short names to full locator strings, loaded from a JSON document of
//! the form `{"save button": "name:Save type:Button"}`. Lookup failure is a
//! silent fallback, not an error: inspector-recorded locators are plain
//! strings rather than registered aliases.

use crate::errors::LocatorError;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct AliasStore {
    entries: HashMap<String, String>,
}

impl AliasStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file. A missing file is an error; a present but
    /// malformed file is too.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LocatorError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LocatorError::PlatformError(format!(
                "failed to read alias database {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let entries: HashMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
            LocatorError::PlatformError(format!(
                "malformed alias database {}: {e}",
                path.as_ref().display()
            ))
        })?;
        debug!(count = entries.len(), "loaded locator aliases");
        Ok(Self { entries })
    }

    pub fn from_entries(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn insert(&mut self, name: impl Into<String>, locator: impl Into<String>) {
        self.entries.insert(name.into(), locator.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
