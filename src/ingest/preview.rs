//! Small previews of staged files for the queue view.

use crate::error::{Result, UploaderError};
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;

/// Files above this size are never previewed (10MB)
pub const MAX_PREVIEW_SIZE: u64 = 10 * 1024 * 1024;

/// Text previews stop after this many lines
pub const MAX_PREVIEW_LINES: usize = 100;

/// Preview a local file: the first lines of a `.txt`, or a data URL for
/// png/jpg/jpeg images
pub async fn preview_file(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path).await?;

    if metadata.len() > MAX_PREVIEW_SIZE {
        return Err(UploaderError::Validation(format!(
            "File size ({} bytes) exceeds preview limit ({} bytes)",
            metadata.len(),
            MAX_PREVIEW_SIZE
        )));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" => {
            let content = tokio::fs::read_to_string(path).await?;
            Ok(content
                .lines()
                .take(MAX_PREVIEW_LINES)
                .collect::<Vec<_>>()
                .join("\n"))
        }
        "png" | "jpg" | "jpeg" => {
            let data = tokio::fs::read(path).await?;
            let mime = if extension == "png" { "png" } else { "jpeg" };
            Ok(format!(
                "data:image/{};base64,{}",
                mime,
                general_purpose::STANDARD.encode(data)
            ))
        }
        _ => Err(UploaderError::Validation(format!(
            "Preview not supported for '{}'",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_text_preview_is_truncated() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("notes.txt");
        let content: Vec<String> = (0..150).map(|i| format!("line {}", i)).collect();
        std::fs::write(&path, content.join("\n")).unwrap();

        let preview = preview_file(&path).await.unwrap();
        assert_eq!(preview.lines().count(), MAX_PREVIEW_LINES);
        assert!(preview.ends_with("line 99"));
    }

    #[tokio::test]
    async fn test_image_preview_is_data_url() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("pixel.PNG");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let preview = preview_file(&path).await.unwrap();
        assert_eq!(preview, "data:image/png;base64,iVBORw==");
    }

    #[tokio::test]
    async fn test_unsupported_type_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("archive.zip");
        std::fs::write(&path, b"PK").unwrap();

        let err = preview_file(&path).await.unwrap_err();
        assert!(err.to_string().contains("Preview not supported"));
    }
}
