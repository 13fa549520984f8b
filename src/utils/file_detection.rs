use std::path::Path;

/// Returns the lowercase extension of `path` with its leading dot (`.png`).
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Decodes file bytes as text, dropping a UTF-8 byte order mark.
///
/// Invalid sequences are replaced rather than rejected; only a read failure
/// makes a file unreadable.
pub fn decode_text(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_extension() {
        assert_eq!(dotted_extension(Path::new("a/b/Logo.PNG")), Some(".png".to_string()));
        assert_eq!(dotted_extension(Path::new("Makefile")), None);
        assert_eq!(dotted_extension(Path::new(".gitignore")), None);
    }

    #[test]
    fn test_decode_text_strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"hello");
        assert_eq!(decode_text(bytes), "hello");
    }

    #[test]
    fn test_decode_text_replaces_invalid_utf8() {
        assert_eq!(decode_text(vec![b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }
}
