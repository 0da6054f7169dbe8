//! Capture inspection and data-URL encoding.

use std::path::Path;

use base64::Engine;
use image::ImageFormat;

use crate::types::{BanterError, BanterResult};

/// What a capture on disk turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub byte_len: u64,
}

/// Sniff the format and dimensions of a capture before it is submitted.
///
/// Blocking. Accepts plain paths and `file://` URIs.
pub fn inspect_capture(capture_ref: &str) -> BanterResult<CaptureInfo> {
    let path = capture_ref.strip_prefix("file://").unwrap_or(capture_ref);
    let bytes = std::fs::read(path)?;
    let format = image::guess_format(&bytes)
        .map_err(|e| BanterError::Capture(format!("{path} is not a recognised image: {e}")))?;
    let (width, height) = image::image_dimensions(path)
        .map_err(|e| BanterError::Capture(format!("Failed to read dimensions of {path}: {e}")))?;

    Ok(CaptureInfo {
        format,
        width,
        height,
        byte_len: bytes.len() as u64,
    })
}

/// MIME type for an image format, defaulting to JPEG like persisted captures.
pub fn mime_type(format: Option<ImageFormat>) -> &'static str {
    match format {
        Some(ImageFormat::Png) => "image/png",
        Some(ImageFormat::WebP) => "image/webp",
        Some(ImageFormat::Gif) => "image/gif",
        Some(ImageFormat::Bmp) => "image/bmp",
        Some(ImageFormat::Tiff) => "image/tiff",
        _ => "image/jpeg",
    }
}

/// Encode image bytes as a `data:` URL a remote model can resolve inline.
pub fn encode_data_url(bytes: &[u8]) -> String {
    let mime = mime_type(image::guess_format(bytes).ok());
    let data = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{data}")
}

/// Read a capture from disk and encode it as a `data:` URL.
pub async fn read_data_url(path: &str) -> BanterResult<String> {
    let local = path.strip_prefix("file://").unwrap_or(path);
    let bytes = tokio::fs::read(local).await?;
    if bytes.is_empty() {
        return Err(BanterError::Capture(format!("{local} is empty")));
    }
    Ok(encode_data_url(&bytes))
}

/// Whether a reference can be fetched by a remote service as-is.
pub fn is_remote_reference(reference: &str) -> bool {
    reference.starts_with("https://") || reference.starts_with("http://") || reference.starts_with("data:")
}

/// Check if a file path points to a supported image format.
pub fn is_supported_format(path: &str) -> bool {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    matches!(
        ext.as_str(),
        "png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp" | "tiff" | "tif" | "heic"
    )
}
