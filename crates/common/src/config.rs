//! Run configuration
//!
//! Defaults match the conventional serverless project layout. A YAML file
//! may override any subset of the fields; the CLI then applies its flags.

use crate::{BuilderError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Directory scanned for handler spec files
    pub source_dir: PathBuf,

    /// Path segment that marks the root of handler names
    pub root_marker: String,

    /// Prefix of the handler reference written to the deployment document
    pub handler_prefix: String,

    /// Base deployment template
    pub template_path: PathBuf,

    /// Generated deployment document
    pub output_path: PathBuf,

    /// Reusable OpenAPI components
    pub components_dir: PathBuf,

    /// Directory holding `info.yml` / `info_<stage>.yml`
    pub info_dir: PathBuf,

    /// Directory the OpenAPI document is written to
    pub openapi_dir: PathBuf,

    /// Directory the documentation pages are written to
    pub docs_dir: PathBuf,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("./src/lambda"),
            root_marker: "lambda".to_string(),
            handler_prefix: "src/lambda".to_string(),
            template_path: PathBuf::from("serverless_template.yml"),
            output_path: PathBuf::from("serverless.yml"),
            components_dir: PathBuf::from("./docs/components"),
            info_dir: PathBuf::from("."),
            openapi_dir: PathBuf::from("."),
            docs_dir: PathBuf::from("./docs/generated"),
        }
    }
}

impl BuilderConfig {
    /// Load configuration from a YAML file, filling unset fields with defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BuilderError::Parse(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        serde_yaml::from_str(&content).map_err(|e| {
            BuilderError::Parse(format!("Failed to parse config YAML from {:?}: {}", path, e))
        })
    }

    /// `info_<stage>.yml` when a stage is given, `info.yml` otherwise
    pub fn info_path(&self, stage: Option<&str>) -> PathBuf {
        match stage {
            Some(stage) => self.info_dir.join(format!("info_{}.yml", stage)),
            None => self.info_dir.join("info.yml"),
        }
    }

    /// `api_doc_<stage>.yml` when a stage is given, `api_doc.yml` otherwise
    pub fn openapi_output_path(&self, stage: Option<&str>) -> PathBuf {
        match stage {
            Some(stage) => self.openapi_dir.join(format!("api_doc_{}.yml", stage)),
            None => self.openapi_dir.join("api_doc.yml"),
        }
    }
}
