//! Where declarations come from

use apispec_builder_common::{BuilderError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Supplies the spec declared by a handler file
#[cfg_attr(test, mockall::automock)]
pub trait SpecSource {
    /// `Ok(None)` when the file declares no spec
    fn load(&self, path: &Path) -> Result<Option<Value>>;
}

/// Reads the declaration from a key of a JSON or YAML document
#[derive(Debug, Clone)]
pub struct DeclarativeSource {
    export_key: String,
}

impl Default for DeclarativeSource {
    fn default() -> Self {
        Self::new("apiSpec")
    }
}

impl DeclarativeSource {
    pub fn new(export_key: impl Into<String>) -> Self {
        Self {
            export_key: export_key.into(),
        }
    }

    fn parse(&self, path: &Path, content: &str, is_json: bool) -> Result<Value> {
        if is_json {
            serde_json::from_str(content).map_err(|e| {
                BuilderError::Parse(format!("Failed to parse JSON from {:?}: {}", path, e))
            })
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                BuilderError::Parse(format!("Failed to parse YAML from {:?}: {}", path, e))
            })
        }
    }
}

impl SpecSource for DeclarativeSource {
    fn load(&self, path: &Path) -> Result<Option<Value>> {
        let is_json = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => true,
            Some("yaml") | Some("yml") => false,
            _ => return Ok(None),
        };

        let content = fs::read_to_string(path)
            .map_err(|e| BuilderError::Parse(format!("Failed to read {:?}: {}", path, e)))?;
        let mut document = self.parse(path, &content, is_json)?;

        Ok(document
            .as_object_mut()
            .and_then(|doc| doc.remove(&self.export_key))
            .filter(|spec| !spec.is_null()))
    }
}
