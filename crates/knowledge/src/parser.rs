//! Document text extraction.

use ragline_core::{AppError, AppResult};
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Markdown,
    Html,
    Code,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("rs") | Some("py") | Some("js") | Some("ts") | Some("go") | Some("c")
            | Some("cpp") | Some("java") | Some("sh") | Some("yaml") | Some("yml")
            | Some("json") | Some("toml") => Self::Code,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Code => "code",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Extract clean text from a document's raw bytes.
///
/// `name` only selects the content type; it is not opened.
pub fn extract_text(name: &str, bytes: &[u8]) -> AppResult<String> {
    let content_type = ContentType::from_path(Path::new(name));
    tracing::debug!("Extracting {} text from '{}'", content_type.as_str(), name);

    if content_type == ContentType::Pdf {
        return pdf_extract::extract_text_from_mem(bytes)
            .map(|text| text.trim().to_string())
            .map_err(|e| {
                AppError::Knowledge(format!("Failed to extract text from PDF '{}': {}", name, e))
            });
    }

    let raw = std::str::from_utf8(bytes).map_err(|_| {
        tracing::warn!("Skipping non UTF-8 document: {}", name);
        AppError::Knowledge(format!("Document '{}' is not valid UTF-8 text", name))
    })?;

    let cleaned = match content_type {
        ContentType::Markdown => clean_markdown(raw),
        ContentType::Html => clean_html(raw),
        ContentType::Code | ContentType::PlainText | ContentType::Pdf => raw.trim().to_string(),
        ContentType::Unknown => {
            if is_likely_text(raw) {
                raw.trim().to_string()
            } else {
                tracing::warn!("Skipping likely binary file: {}", name);
                return Err(AppError::Knowledge(format!(
                    "Binary file not supported: {}",
                    name
                )));
            }
        }
    };

    Ok(cleaned)
}

/// Read a file from disk and extract its text.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;
    extract_text(&path.to_string_lossy(), &bytes)
}

/// Clean markdown by removing excess formatting.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        // Horizontal rules and code fences
        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Strip HTML tags, dropping script and style bodies.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;

            let rest = &text[i..];
            if starts_with_ignore_case(rest, "<script") {
                in_script = true;
            } else if starts_with_ignore_case(rest, "</script") {
                in_script = false;
            } else if starts_with_ignore_case(rest, "<style") {
                in_style = true;
            } else if starts_with_ignore_case(rest, "</style") {
                in_style = false;
            }
        } else if ch == '>' {
            in_tag = false;
            // Keep words on either side of a tag apart
            result.push(' ');
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

/// Check if text is likely text (not binary).
fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(ContentType::from_path(Path::new("file.md")), ContentType::Markdown);
        assert_eq!(ContentType::from_path(Path::new("report.PDF")), ContentType::Pdf);
        assert_eq!(ContentType::from_path(Path::new("file.rs")), ContentType::Code);
        assert_eq!(ContentType::from_path(Path::new("file.txt")), ContentType::PlainText);
        assert_eq!(ContentType::from_path(Path::new("noext")), ContentType::Unknown);
    }

    #[test]
    fn test_clean_markdown() {
        let input = "# Header\n\nSome text\n\n```rust\ncode\n```\n\nMore text";
        let output = clean_markdown(input);
        assert!(output.contains("Header"));
        assert!(output.contains("Some text"));
        assert!(output.contains("More text"));
        assert!(!output.contains("```"));
    }

    #[test]
    fn test_clean_html() {
        let input = "<html><body><p>Hello <b>world</b></p></body></html>";
        assert_eq!(clean_html(input), "Hello world");
    }

    #[test]
    fn test_clean_html_drops_script_and_handles_multibyte() {
        let input = "<p>Café</p><SCRIPT>var x = 1;</SCRIPT><p>naïve résumé</p>";
        assert_eq!(clean_html(input), "Café naïve résumé");
    }

    #[test]
    fn test_extract_plain_text() {
        let text = extract_text("notes.txt", b"  The cat sat on the mat.\n").unwrap();
        assert_eq!(text, "The cat sat on the mat.");
    }

    #[test]
    fn test_extract_rejects_binary() {
        assert!(extract_text("blob.bin", &[0x00, 0x01, 0x02, 0x03]).is_err());
        assert!(extract_text("data", &[0xff, 0xfe, 0xfd]).is_err());
    }

    #[test]
    fn test_extract_invalid_pdf() {
        let err = extract_text("broken.pdf", b"not a pdf").unwrap_err();
        assert!(err.to_string().contains("broken.pdf"));
    }

    #[test]
    fn test_parse_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.md");
        std::fs::write(&path, "# Title\nBody line").unwrap();

        let text = parse_file(&path).unwrap();
        assert_eq!(text, "Title\nBody line");
    }
}
