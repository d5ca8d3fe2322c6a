//! Content-type inference from payload signatures.
//!
//! Response headers from the backend are not trusted for content types;
//! everything is re-derived from the bytes actually stored or returned.

/// Infer a MIME type from the leading bytes of `data`.
///
/// Recognizes the image formats the host produces. Unknown payloads fall
/// back to `application/octet-stream`.
pub fn from_bytes(data: &[u8]) -> &'static str {
    if data.starts_with(b"\xFF\xD8") {
        return "image/jpeg";
    }
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png";
    }
    if data.starts_with(b"GIF8") {
        return "image/gif";
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return "image/webp";
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return match &data[8..12] {
            b"avif" | b"avis" => "image/avif",
            b"heic" | b"heix" => "image/heic",
            _ => "application/octet-stream",
        };
    }
    if data.starts_with(b"II*\x00") || data.starts_with(b"MM\x00*") {
        return "image/tiff";
    }
    // SVG has no magic number; look for the opening tag near the start.
    let head = &data[..data.len().min(1024)];
    if let Ok(text) = std::str::from_utf8(head) {
        let trimmed = text.trim_start();
        if trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && text.contains("<svg")) {
            return "image/svg+xml";
        }
    }
    "application/octet-stream"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jpeg() {
        assert_eq!(from_bytes(b"\xFF\xD8\xFF\xE0rest"), "image/jpeg");
    }

    #[test]
    fn test_png() {
        assert_eq!(from_bytes(b"\x89PNG\r\n\x1a\nrest"), "image/png");
    }

    #[test]
    fn test_gif() {
        assert_eq!(from_bytes(b"GIF89a"), "image/gif");
    }

    #[test]
    fn test_webp() {
        assert_eq!(from_bytes(b"RIFF\x00\x00\x00\x00WEBPVP8 "), "image/webp");
    }

    #[test]
    fn test_avif() {
        assert_eq!(from_bytes(b"\x00\x00\x00\x1cftypavif"), "image/avif");
    }

    #[test]
    fn test_svg() {
        assert_eq!(from_bytes(b"  <svg xmlns=\"a\"></svg>"), "image/svg+xml");
        assert_eq!(
            from_bytes(b"<?xml version=\"1.0\"?>\n<svg></svg>"),
            "image/svg+xml"
        );
    }

    #[test]
    fn test_unknown_falls_back() {
        assert_eq!(from_bytes(b"hello"), "application/octet-stream");
        assert_eq!(from_bytes(b""), "application/octet-stream");
    }
}
