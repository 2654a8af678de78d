//! Spec loading into the registry

use crate::legacy::normalize_event;
use crate::source::SpecSource;
use crate::walker::FileRecord;
use apispec_builder_common::naming::{derive_name, strip_http_method_segments};
use apispec_builder_common::{ApiSpec, BuilderError, EventBinding, Result, SpecRegistry};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file whose declaration could not be used
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of one loading run
#[derive(Debug, Default)]
pub struct LoadReport {
    pub registry: SpecRegistry,
    /// Files that declare no spec
    pub skipped: usize,
    pub failures: Vec<LoadFailure>,
}

/// Builds a [`SpecRegistry`] from walked files
pub struct SpecLoader<S: SpecSource> {
    source: S,
    root_marker: String,
}

impl<S: SpecSource> SpecLoader<S> {
    pub fn new(source: S, root_marker: impl Into<String>) -> Self {
        Self {
            source,
            root_marker: root_marker.into(),
        }
    }

    /// Load every file in order
    ///
    /// Only a path without the root marker aborts the run. Unreadable or
    /// malformed declarations are logged and collected in the report.
    pub fn load(&self, files: &[FileRecord]) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        for file in files {
            let name = derive_name(&file.path, &self.root_marker)?;

            match self.load_one(&file.path, &name) {
                Ok(Some(item)) => {
                    debug!(
                        path = %file.path.display(),
                        name = %item.name,
                        category = %item.category,
                        "loaded spec"
                    );
                    report.registry.insert(file.path.clone(), item);
                }
                Ok(None) => {
                    debug!(path = %file.path.display(), "no spec declared");
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "skipping spec");
                    report.failures.push(LoadFailure {
                        path: file.path.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    fn load_one(&self, path: &Path, name: &str) -> Result<Option<ApiSpec>> {
        let Some(mut raw) = self.source.load(path)? else {
            return Ok(None);
        };

        if normalize_event(&mut raw) {
            debug!(path = %path.display(), "normalized legacy event declaration");
        }

        let mut item = into_spec(raw)?;
        let unknown = item
            .event
            .iter()
            .filter(|binding| matches!(binding, EventBinding::Unknown))
            .count();
        if unknown > 0 {
            warn!(path = %path.display(), count = unknown, "ignoring bindings of unknown type");
        }
        if item.operation_id.as_deref().map_or(true, str::is_empty) {
            item.operation_id = Some(name.to_string());
        }
        item.name = name.to_string();
        item.uri = strip_http_method_segments(name);

        Ok(Some(item))
    }
}

fn into_spec(raw: Value) -> Result<ApiSpec> {
    if raw.get("category").map_or(true, Value::is_null) {
        return Err(BuilderError::Parse("Spec declares no category".to_string()));
    }
    serde_json::from_value(raw).map_err(|e| BuilderError::Parse(format!("Invalid spec: {}", e)))
}
