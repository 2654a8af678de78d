//! Project metadata loading from `info.yml` files
//!
//! The info file feeds the OpenAPI `info`/`servers` sections and the
//! documentation page header.

use crate::{BuilderError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Root structure of an `info_<stage>.yml` file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// OpenAPI `info` object (title, description, contact, version, ...)
    #[serde(default)]
    pub info: serde_json::Map<String, Value>,

    /// OpenAPI `servers` list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Documentation database the docs are published into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
}

impl ProjectInfo {
    /// Load project info from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BuilderError::Parse(format!("Failed to read project info file {:?}: {}", path, e))
        })?;

        Self::from_yaml(&content).map_err(|e| {
            BuilderError::Parse(format!(
                "Failed to parse project info YAML from {:?}: {}",
                path, e
            ))
        })
    }

    /// Parse project info from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn title(&self) -> &str {
        self.info_str("title").unwrap_or("API")
    }

    pub fn description(&self) -> Option<&str> {
        self.info_str("description")
    }

    pub fn contact(&self) -> Option<&Value> {
        self.info.get("contact")
    }

    fn info_str(&self, key: &str) -> Option<&str> {
        self.info.get(key).and_then(Value::as_str)
    }
}
