//! Text extraction for non-PDF document formats
//!
//! Drive imports and directory ingestion hand us HTML, Markdown, or plain
//! text alongside PDFs. This module detects the content type and extracts a
//! normalized text body plus an optional title.

mod html;
mod markdown;

pub use html::parse_html;
pub use markdown::parse_markdown;

use crate::error::Result;
use std::path::Path;

/// Content types the pipeline can ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Html,
    Markdown,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension
    pub fn from_extension(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("pdf") => ContentType::Pdf,
            Some("html") | Some("htm") => ContentType::Html,
            Some("md") | Some("markdown") | Some("mdx") => ContentType::Markdown,
            Some("txt") | Some("text") => ContentType::PlainText,
            _ => ContentType::Unknown,
        }
    }

    /// Detect content type from a MIME type string
    pub fn from_mime(mime: &str) -> Self {
        let mime_lower = mime.to_lowercase();
        if mime_lower.contains("application/pdf") {
            ContentType::Pdf
        } else if mime_lower.contains("text/html") || mime_lower.contains("application/xhtml") {
            ContentType::Html
        } else if mime_lower.contains("text/markdown") {
            ContentType::Markdown
        } else if mime_lower.contains("text/plain") {
            ContentType::PlainText
        } else {
            ContentType::Unknown
        }
    }

    /// Detect from both a path and an optional MIME type; MIME wins
    pub fn detect(path: Option<&Path>, mime: Option<&str>) -> Self {
        if let Some(m) = mime {
            let detected = Self::from_mime(m);
            if detected != ContentType::Unknown {
                return detected;
            }
        }

        if let Some(p) = path {
            let guessed = mime_guess::from_path(p).first_raw();
            if let Some(g) = guessed {
                let detected = Self::from_mime(g);
                if detected != ContentType::Unknown {
                    return detected;
                }
            }
            return Self::from_extension(p);
        }

        ContentType::Unknown
    }
}

/// Extracted text body with an optional title
#[derive(Debug, Clone)]
pub struct ParsedText {
    pub title: Option<String>,
    pub text: String,
}

/// Parse textual content by detected type. PDF bytes never come through
/// here; they go to the extractor.
pub fn parse_content(content: &str, content_type: ContentType) -> Result<ParsedText> {
    match content_type {
        ContentType::Html => parse_html(content),
        ContentType::Markdown => parse_markdown(content),
        _ => Ok(ParsedText {
            title: None,
            text: normalize_whitespace(content),
        }),
    }
}

/// Check if content appears to be binary (null bytes in the first 8 KiB)
pub fn is_binary_content(data: &[u8]) -> bool {
    let check_len = std::cmp::min(data.len(), 8192);
    data[..check_len].contains(&0)
}

/// Collapse whitespace: runs of blank lines become a paragraph break, single
/// newlines survive, other whitespace becomes one space.
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last_was_whitespace = true;
    let mut newline_count = 0;

    for c in text.chars() {
        if c.is_whitespace() {
            if c == '\n' {
                newline_count += 1;
            }
            last_was_whitespace = true;
        } else {
            if last_was_whitespace && !result.is_empty() {
                if newline_count >= 2 {
                    result.push_str("\n\n");
                } else if newline_count == 1 {
                    result.push('\n');
                } else {
                    result.push(' ');
                }
            }
            newline_count = 0;
            result.push(c);
            last_was_whitespace = false;
        }
    }

    result.trim().to_string()
}
