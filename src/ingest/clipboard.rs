use crate::error::Result;

/// OS clipboard access, provided by the shell around this crate
pub trait Clipboard: Send + Sync {
    fn has_text(&self) -> Result<bool>;
    fn read_text(&self) -> Result<String>;
    fn has_image(&self) -> Result<bool>;
    /// Image content as base64 (no data URL prefix)
    fn read_image_base64(&self) -> Result<String>;
    fn has_files(&self) -> Result<bool>;
    fn read_files(&self) -> Result<Vec<String>>;
}
