use std::path::Path;

/// Sniffs the image format from its leading magic bytes.
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x42, 0x4D, ..] => Some("image/bmp"),
        [_, _, _, _, 0x66, 0x74, 0x79, 0x70, b'h', b'e', b'i', b'c', ..] => Some("image/heic"),
        [_, _, _, _, 0x66, 0x74, 0x79, 0x70, b'a', b'v', b'i', b'f', ..] => Some("image/avif"),
        _ => {
            tracing::debug!(
                "Unrecognized image format (first 4 bytes: {:02X?})",
                &bytes[..bytes.len().min(4)]
            );
            None
        }
    }
}

/// Media type declared by a file's extension.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let media_type = match extension.as_str() {
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "avif" => "image/avif",
        "tif" | "tiff" => "image/tiff",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "json" => "application/json",
        _ => return None,
    };
    Some(media_type)
}

/// Strips parameters from a `Content-Type` value and lowercases it.
pub fn normalize_media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_image_media_type(media_type: &str) -> bool {
    normalize_media_type(media_type).starts_with("image/")
}
