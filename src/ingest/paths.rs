//! Path resolution for dropped or picked files and folders.

use crate::error::{Result, UploaderError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, MAIN_SEPARATOR};
use walkdir::WalkDir;

/// One resolved file under a dropped path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetail {
    pub id: String,
    pub path: String,
    pub relative_path: String,
    pub is_dir: bool,
}

/// Expands one path into the files it stands for
pub trait PathResolver: Send + Sync {
    fn resolve(&self, path: &Path) -> Result<Vec<FileDetail>>;
}

/// Turn a resolved relative path into a platform independent object key:
/// leading separators are dropped and every `sep` becomes `/`.
pub fn normalize_relative_path_with(path: &str, sep: char) -> String {
    let converted = if sep == '/' {
        path.to_string()
    } else {
        path.replace(sep, "/")
    };
    converted.trim_start_matches('/').to_string()
}

pub fn normalize_relative_path(path: &str) -> String {
    normalize_relative_path_with(path, MAIN_SEPARATOR)
}

/// Stable id for a file, derived from its absolute path
pub fn file_id(path: &Path) -> String {
    hex::encode(Sha256::digest(path.to_string_lossy().as_bytes()))
}

/// Walks the local filesystem. Directories expand recursively in file-name
/// order, relative to the dropped directory; a single file is relative to
/// its parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPathResolver;

impl FsPathResolver {
    fn detail(path: &Path, base: &Path) -> FileDetail {
        let relative_path = path
            .strip_prefix(base)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| path.to_string_lossy().into_owned());

        FileDetail {
            id: file_id(path),
            path: path.to_string_lossy().into_owned(),
            relative_path,
            is_dir: false,
        }
    }
}

impl PathResolver for FsPathResolver {
    fn resolve(&self, path: &Path) -> Result<Vec<FileDetail>> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            UploaderError::Ingestion(format!(
                "Failed to read metadata for '{}': {}",
                path.display(),
                e
            ))
        })?;

        if !metadata.is_dir() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            return Ok(vec![Self::detail(path, base)]);
        }

        let mut details = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                UploaderError::Ingestion(format!(
                    "Failed to read directory '{}': {}",
                    path.display(),
                    e
                ))
            })?;

            if entry.file_type().is_file() {
                details.push(Self::detail(entry.path(), path));
            }
        }

        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_strips_leading_separator() {
        assert_eq!(normalize_relative_path_with("/a/b.txt", '/'), "a/b.txt");
        assert_eq!(normalize_relative_path_with("a/b.txt", '/'), "a/b.txt");
        assert_eq!(normalize_relative_path_with("\\sub\\b.txt", '\\'), "sub/b.txt");
        assert_eq!(normalize_relative_path_with("sub\\deep\\c.txt", '\\'), "sub/deep/c.txt");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            ("/a/b.txt", '/'),
            ("//a//b.txt", '/'),
            ("\\\\x\\y", '\\'),
            ("\\/mixed\\path/", '\\'),
            ("", '/'),
            ("plain.txt", '\\'),
        ];
        for (path, sep) in samples {
            let once = normalize_relative_path_with(path, sep);
            let twice = normalize_relative_path_with(&once, sep);
            assert_eq!(once, twice, "not idempotent for {:?}", path);
            assert!(!once.starts_with('/'));
        }
    }

    #[test]
    fn test_resolve_directory_relative_to_root() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("x");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("sub").join("b.txt"), "b").unwrap();

        let details = FsPathResolver.resolve(&root).unwrap();
        let relative: Vec<String> = details
            .iter()
            .map(|d| normalize_relative_path(&d.relative_path))
            .collect();

        assert_eq!(relative, vec!["a.txt", "sub/b.txt"]);
        assert!(details.iter().all(|d| !d.is_dir));
        assert_ne!(details[0].id, details[1].id);
    }

    #[test]
    fn test_resolve_single_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("photo.png");
        fs::write(&file, [0u8; 4]).unwrap();

        let details = FsPathResolver.resolve(&file).unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].relative_path, "photo.png");
        assert_eq!(details[0].id, file_id(&file));
    }

    #[test]
    fn test_resolve_missing_path_fails() {
        let temp = tempdir().unwrap();
        let err = FsPathResolver
            .resolve(&temp.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, UploaderError::Ingestion(_)));
    }
}
