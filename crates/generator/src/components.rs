//! Reusable OpenAPI components
//!
//! Layout of the components directory:
//!
//! ```text
//! docs/components/
//!   schemas/pet.yml        -> components.schemas
//!   parameters/paging.yml  -> components.parameters
//!   examples/...           -> components.examples
//!   responses/...          -> components.responses
//! ```
//!
//! Files inside a section are YAML mappings merged by top-level key, in file
//! name order. Other directories are ignored.

use apispec_builder_common::{BuilderError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sections copied into `components`
pub const COMPONENT_SECTIONS: [&str; 4] = ["schemas", "parameters", "examples", "responses"];

/// Load the components directory; a missing directory yields an empty map
pub fn generate_components(dir: &Path) -> Result<Map<String, Value>> {
    let mut components = Map::new();
    if !dir.exists() {
        debug!(dir = %dir.display(), "no components directory");
        return Ok(components);
    }

    for entry in sorted_entries(dir)? {
        let Some(section) = entry.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !COMPONENT_SECTIONS.contains(&section) {
            continue;
        }

        let mut merged = Map::new();
        for file in sorted_entries(&entry)? {
            if file.is_dir() {
                debug!(path = %file.display(), "skipping nested directory in components");
                continue;
            }
            if let Some(definitions) = read_definitions(&file)? {
                merged.extend(definitions);
            }
        }
        components.insert(section.to_string(), Value::Object(merged));
    }

    Ok(components)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn read_definitions(path: &Path) -> Result<Option<Map<String, Value>>> {
    let content = fs::read_to_string(path).map_err(|e| {
        BuilderError::Parse(format!("Failed to read component file {:?}: {}", path, e))
    })?;

    let value: Value = serde_yaml::from_str(&content).map_err(|e| {
        BuilderError::Parse(format!("Failed to parse component YAML from {:?}: {}", path, e))
    })?;

    match value {
        Value::Object(map) => Ok(Some(map)),
        Value::Null => Ok(None),
        _ => Err(BuilderError::Parse(format!(
            "Component file {:?} is not a mapping",
            path
        ))),
    }
}
