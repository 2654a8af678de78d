//! Name and route derivation from handler paths
//!
//! A handler at `src/lambda/pet/post.yml` is named `pet/post`, its route is
//! `pet` and its deployment key is `pet_post`.

use crate::{BuilderError, Result};
use std::path::Path;

/// Path segments that name an HTTP method rather than a resource
const HTTP_METHOD_SEGMENTS: [&str; 4] = ["post", "get", "put", "delete"];

/// Derive a handler name from its file path
///
/// The extension is stripped, separators are normalized to `/` and every
/// segment after the first `root_marker` segment is kept.
///
/// # Examples
/// ```
/// use apispec_builder_common::naming::derive_name;
/// use std::path::Path;
///
/// let name = derive_name(Path::new("/srv/app/src/lambda/pet/post.yml"), "lambda").unwrap();
/// assert_eq!(name, "pet/post");
/// ```
pub fn derive_name(path: &Path, root_marker: &str) -> Result<String> {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let without_ext = strip_extension(&normalized);

    let segments: Vec<&str> = without_ext.split('/').collect();
    let marker_idx = segments
        .iter()
        .position(|s| *s == root_marker)
        .ok_or_else(|| BuilderError::MissingRootMarker {
            path: normalized.clone(),
            marker: root_marker.to_string(),
        })?;

    Ok(segments[marker_idx + 1..].join("/"))
}

/// Remove every `post`, `get`, `put` or `delete` path segment
///
/// # Examples
/// ```
/// use apispec_builder_common::naming::strip_http_method_segments;
///
/// assert_eq!(strip_http_method_segments("pet/post"), "pet");
/// assert_eq!(strip_http_method_segments("/path/to/resource"), "/path/to/resource");
/// ```
pub fn strip_http_method_segments(name: &str) -> String {
    name.split('/')
        .filter(|segment| !HTTP_METHOD_SEGMENTS.contains(segment))
        .collect::<Vec<_>>()
        .join("/")
}

/// Key used in the deployment function map (`pet/post` → `pet_post`)
pub fn function_key(name: &str) -> String {
    name.split('/').collect::<Vec<_>>().join("_")
}

/// Uppercase the first character
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..file_start + dot],
        _ => path,
    }
}
