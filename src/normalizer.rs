//! Path-to-key normalization.
//!
//! The host hands adapters a URL path that is percent-encoded and always
//! starts with a slash. S3 keys are neither, so the path is decoded exactly
//! once and the leading slash removed before the configured root-path prefix
//! is joined on.

use percent_encoding::percent_decode_str;
use tracing::debug;

/// Convert a URL path received from the host into an S3 key.
///
/// Percent-escapes are decoded once; malformed escape sequences pass
/// through literally. An escape that decodes to invalid UTF-8 becomes
/// U+FFFD without disturbing the rest of the path, so one bad byte never
/// re-encodes the whole key. Exactly one leading slash is stripped. A
/// non-empty `prefix` has its trailing slashes removed and is joined with
/// a single slash, so the result never contains `//` at the join boundary.
pub fn normalize(prefix: &str, raw_path: &str) -> String {
    let decoded = percent_decode_str(raw_path).decode_utf8_lossy();
    let path = decoded.strip_prefix('/').unwrap_or(&decoded);

    let key = if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), path)
    };

    debug!("normalized '{}' -> '{}'", raw_path, key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_single_leading_slash() {
        assert_eq!(normalize("", "/some/image.jpg"), "some/image.jpg");
    }

    #[test]
    fn test_strips_only_one_leading_slash() {
        assert_eq!(normalize("", "//odd/path"), "/odd/path");
    }

    #[test]
    fn test_empty_prefix_returns_path_unchanged() {
        assert_eq!(normalize("", "plain/path.png"), "plain/path.png");
    }

    #[test]
    fn test_prefix_is_joined_with_single_slash() {
        assert_eq!(normalize("/st", "/a/b.jpg"), "/st/a/b.jpg");
    }

    #[test]
    fn test_prefix_trailing_slashes_removed() {
        assert_eq!(normalize("/st///", "/a/b.jpg"), "/st/a/b.jpg");
        assert_eq!(normalize("st/", "/a/b.jpg"), "st/a/b.jpg");
    }

    #[test]
    fn test_percent_escapes_decoded_once() {
        assert_eq!(normalize("", "/with%20space.jpg"), "with space.jpg");
        // %2520 is an encoded "%20": only the outer escape is decoded.
        assert_eq!(normalize("", "/double%2520enc.jpg"), "double%20enc.jpg");
    }

    #[test]
    fn test_malformed_escapes_pass_through() {
        assert_eq!(normalize("", "/bad%zzescape"), "bad%zzescape");
        assert_eq!(normalize("", "/trailing%"), "trailing%");
    }

    #[test]
    fn test_invalid_utf8_escape_does_not_disable_decoding() {
        // %FF is a well-formed escape but not valid UTF-8; it becomes the
        // replacement character while %20 in the same path still decodes.
        assert_eq!(normalize("", "/a%FF%20b"), "a\u{FFFD} b");
    }

    #[test]
    fn test_no_double_slash_at_join() {
        for prefix in ["/rs", "/rs/", "rs", "rs//"] {
            let key = normalize(prefix, "/img.jpg");
            assert!(!key.contains("//"), "double slash in '{key}'");
            assert!(key.starts_with(prefix.trim_end_matches('/')));
        }
    }
}
