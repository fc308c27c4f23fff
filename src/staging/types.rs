//! Staged item model.
//!
//! The item kind is carried by the `StagedContent` variant itself, so an
//! item can never claim to be a file while holding inline content.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Text,
    Image,
}

/// Image formats recognised from clipboard payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }
}

/// Where the bytes of a staged item come from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "source", rename_all = "lowercase")]
pub enum StagedContent {
    File {
        #[serde(rename = "filePath")]
        file_path: PathBuf,
    },
    Text {
        #[serde(rename = "fileContent")]
        file_content: String,
    },
    /// `file_content` is a `data:<mime>;base64,` URL
    Image {
        #[serde(rename = "fileContent")]
        file_content: String,
        format: ImageFormat,
    },
}

impl StagedContent {
    pub fn kind(&self) -> ItemKind {
        match self {
            StagedContent::File { .. } => ItemKind::File,
            StagedContent::Text { .. } => ItemKind::Text,
            StagedContent::Image { .. } => ItemKind::Image,
        }
    }
}

/// An item waiting in the staging queue.
///
/// Only the remote name, prefix and selection flag change after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedItem {
    id: String,
    #[serde(flatten)]
    content: StagedContent,
    remote_filename: String,
    remote_filename_prefix: String,
    selected: bool,
}

impl StagedItem {
    fn new(id: String, content: StagedContent, remote_filename: String) -> Self {
        Self {
            id,
            content,
            remote_filename,
            remote_filename_prefix: String::new(),
            selected: false,
        }
    }

    pub fn file(
        id: impl Into<String>,
        file_path: PathBuf,
        remote_filename: impl Into<String>,
    ) -> Self {
        Self::new(
            id.into(),
            StagedContent::File { file_path },
            remote_filename.into(),
        )
    }

    pub fn text(
        id: impl Into<String>,
        content: String,
        remote_filename: impl Into<String>,
    ) -> Self {
        Self::new(
            id.into(),
            StagedContent::Text {
                file_content: content,
            },
            remote_filename.into(),
        )
    }

    pub fn image(
        id: impl Into<String>,
        data_url: String,
        format: ImageFormat,
        remote_filename: impl Into<String>,
    ) -> Self {
        Self::new(
            id.into(),
            StagedContent::Image {
                file_content: data_url,
                format,
            },
            remote_filename.into(),
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ItemKind {
        self.content.kind()
    }

    pub fn content(&self) -> &StagedContent {
        &self.content
    }

    pub fn file_path(&self) -> Option<&Path> {
        match &self.content {
            StagedContent::File { file_path } => Some(file_path),
            _ => None,
        }
    }

    pub fn remote_filename(&self) -> &str {
        &self.remote_filename
    }

    pub fn remote_filename_prefix(&self) -> &str {
        &self.remote_filename_prefix
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_remote_filename(&mut self, remote_filename: impl Into<String>) {
        self.remote_filename = remote_filename.into();
    }

    pub fn set_remote_filename_prefix(&mut self, prefix: impl Into<String>) {
        self.remote_filename_prefix = prefix.into();
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Object key: prefix and filename joined by a single `/`
    pub fn remote_key(&self) -> String {
        let name = self.remote_filename.trim_start_matches('/');
        let prefix = self.remote_filename_prefix.trim_matches('/');
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        }
    }

    /// Name shown in history: the local file name for files, else the remote name
    pub fn display_name(&self) -> String {
        self.file_path()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.remote_filename.clone())
    }
}
