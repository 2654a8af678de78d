//! Handler discovery and API spec loading
//!
//! This crate turns a directory of handler files into a [`SpecRegistry`].
//!
//! ## Loading Strategy
//!
//! 1. The walker lists every file below the handler root.
//! 2. A [`SpecSource`] is asked for each file's declared spec. The default
//!    [`DeclarativeSource`] reads the `apiSpec` key of JSON/YAML files.
//! 3. Legacy single-object `event` declarations are normalized into the list
//!    form, then the document is deserialized into an `ApiSpec`.
//! 4. `name`, `uri` and `operationId` are derived from the file path and the
//!    spec is appended to its category bucket.
//!
//! A file that fails to load is logged and skipped; it never aborts the run.
//!
//! ## Usage
//! ```rust,ignore
//! use apispec_builder_loader::{walk, DeclarativeSource, SpecLoader};
//!
//! let files = walk("./src/lambda")?;
//! let report = SpecLoader::new(DeclarativeSource::default(), "lambda").load(&files)?;
//! println!("{} specs", report.registry.len());
//! ```

mod legacy;
mod loader;
mod source;
mod walker;

pub use legacy::normalize_event;
pub use loader::{LoadFailure, LoadReport, SpecLoader};
pub use source::{DeclarativeSource, SpecSource};
pub use walker::{walk, FileRecord};

use apispec_builder_common::{BuilderConfig, Result};

/// Walk the configured handler root and load every declared spec
///
/// # Arguments
/// * `config` - supplies the handler root (`source_dir`) and the root marker
///
/// # Returns
/// * `LoadReport` - the registry plus skipped/failed file bookkeeping
pub fn load_registry(config: &BuilderConfig) -> Result<LoadReport> {
    let files = walk(&config.source_dir)?;
    SpecLoader::new(DeclarativeSource::default(), &config.root_marker).load(&files)
}

