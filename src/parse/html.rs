//! HTML text extraction

use super::{normalize_whitespace, ParsedText};
use crate::error::Result;
use scraper::{Html, Selector};

/// Parse HTML and extract the title plus a plain-text body
pub fn parse_html(content: &str) -> Result<ParsedText> {
    let document = Html::parse_document(content);

    let title = Selector::parse("title").ok().and_then(|selector| {
        document.select(&selector).next().map(|elem| {
            elem.text().collect::<String>().trim().to_string()
        })
    });
    let title = title.filter(|t| !t.is_empty());

    // Prefer the body subtree so head metadata never lands in the text
    let body = Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next())
        .map(|e| e.html())
        .unwrap_or_else(|| content.to_string());

    let text = html2text::from_read(body.as_bytes(), 80).unwrap_or_else(|_| body.clone());

    Ok(ParsedText {
        title,
        text: normalize_whitespace(&text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_html_basic() {
        let html = r#"
        <!DOCTYPE html>
        <html>
        <head><title>Test Page</title><style>body { color: red }</style></head>
        <body>
            <h1>Main Heading</h1>
            <p>Some paragraph text here.</p>
        </body>
        </html>
        "#;

        let parsed = parse_html(html).unwrap();

        assert_eq!(parsed.title, Some("Test Page".to_string()));
        assert!(parsed.text.contains("Main Heading"));
        assert!(parsed.text.contains("paragraph text"));
        assert!(!parsed.text.contains("color: red"));
    }

    #[test]
    fn test_missing_title_is_none() {
        let parsed = parse_html("<html><body><p>No head here.</p></body></html>").unwrap();
        assert!(parsed.title.is_none());
        assert!(parsed.text.contains("No head here"));
    }

    #[test]
    fn test_inline_markup_flattened() {
        let parsed =
            parse_html("<html><body><p>Hello <strong>world</strong>!</p></body></html>").unwrap();
        assert!(parsed.text.contains("Hello"));
        assert!(parsed.text.contains("world"));
    }
}
