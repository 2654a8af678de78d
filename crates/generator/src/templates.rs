//! Template loading and management

use apispec_builder_common::{BuilderError, Result};
use std::collections::HashMap;
use tera::{Tera, Value};

/// Load all templates
pub fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();

    tera.register_filter("md_cell", md_cell_filter);

    tera.add_raw_template(
        "documentation.md",
        include_str!("../templates/documentation.md.tera"),
    )
    .map_err(|e| {
        BuilderError::Template(format!("Failed to load documentation.md template: {}", e))
    })?;

    Ok(tera)
}

/// Filter to make a string safe inside a Markdown table cell
fn md_cell_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("md_cell filter expects a string"))?;

    let escaped = s
        .replace('|', "\\|")
        .replace("\r\n", " ")
        .replace('\n', " ");

    Ok(Value::String(escaped))
}
