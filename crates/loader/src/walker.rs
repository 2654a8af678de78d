//! Recursive handler file discovery

use apispec_builder_common::Result;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A regular file found below the handler root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
}

/// List every regular file below `root`, depth-first, siblings sorted by name
///
/// A missing root or an unreadable entry fails the whole walk.
pub fn walk(root: impl AsRef<Path>) -> Result<Vec<FileRecord>> {
    let root = root.as_ref();
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(FileRecord {
                path: entry.into_path(),
            });
        }
    }

    debug!(root = %root.display(), count = files.len(), "walked handler root");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apispec_builder_common::BuilderError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_walk_lists_nested_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pet/nested")).unwrap();
        fs::write(dir.path().join("pet/post.yml"), "x").unwrap();
        fs::write(dir.path().join("pet/get.yml"), "x").unwrap();
        fs::write(dir.path().join("pet/nested/deep.json"), "{}").unwrap();
        fs::write(dir.path().join("README.md"), "readme").unwrap();

        let files = walk(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| {
                f.path
                    .strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();

        assert_eq!(
            names,
            vec!["README.md", "pet/get.yml", "pet/nested/deep.json", "pet/post.yml"]
        );
    }

    #[test]
    fn test_walk_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(walk(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_walk_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = walk(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, BuilderError::Io(_)));
    }
}
