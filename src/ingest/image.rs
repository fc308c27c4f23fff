//! Clipboard image format detection from the base64 payload prefix.

use crate::staging::ImageFormat;

const SIGNATURES: &[(&str, ImageFormat)] = &[
    ("iVBORw0KGgo", ImageFormat::Png),
    ("/9j/", ImageFormat::Jpeg),
    ("R0lGODlh", ImageFormat::Gif),
    ("UklGR", ImageFormat::Webp),
];

/// Detect the format from the leading base64 characters; unknown payloads are PNG
pub fn sniff_image_format(base64_payload: &str) -> ImageFormat {
    SIGNATURES
        .iter()
        .find(|(prefix, _)| base64_payload.starts_with(prefix))
        .map(|(_, format)| *format)
        .unwrap_or_default()
}

pub fn to_data_url(format: ImageFormat, base64_payload: &str) -> String {
    format!("data:{};base64,{}", format.mime_type(), base64_payload)
}
