//! Markdown text extraction

use super::ParsedText;
use crate::error::Result;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

/// Parse Markdown and extract the title plus a plain-text body. The first
/// level-one heading becomes the title when present.
pub fn parse_markdown(content: &str) -> Result<ParsedText> {
    let parser = Parser::new(content);

    let mut title: Option<String> = None;
    let mut text_parts: Vec<String> = Vec::new();
    let mut current_heading: Option<(u8, Vec<String>)> = None;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current_heading = Some((heading_level_to_u8(level), Vec::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, parts)) = current_heading.take() {
                    let heading_text = parts.join("").trim().to_string();
                    if !heading_text.is_empty() {
                        if title.is_none() && level == 1 {
                            title = Some(heading_text.clone());
                        }
                        text_parts.push(format!("\n{}\n", heading_text));
                    }
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                text_parts.push("\n".to_string());
            }
            Event::Text(text) => {
                if let Some((_, ref mut parts)) = current_heading {
                    parts.push(text.to_string());
                } else {
                    text_parts.push(text.to_string());
                }
            }
            Event::Code(code) => {
                if let Some((_, ref mut parts)) = current_heading {
                    parts.push(code.to_string());
                } else {
                    text_parts.push(code.to_string());
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                text_parts.push(" ".to_string());
            }
            Event::End(TagEnd::Paragraph) => {
                text_parts.push("\n\n".to_string());
            }
            Event::Start(Tag::Item) => {
                text_parts.push("• ".to_string());
            }
            Event::End(TagEnd::Item) => {
                text_parts.push("\n".to_string());
            }
            Event::End(TagEnd::List(_)) => {
                text_parts.push("\n".to_string());
            }
            _ => {}
        }
    }

    Ok(ParsedText {
        title,
        text: text_parts.join("").trim().to_string(),
    })
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markdown_basic() {
        let markdown = r#"
# Main Title

This is a paragraph with some text.

## Section One

More content here with `inline code`.

- Item 1
- Item 2
"#;

        let parsed = parse_markdown(markdown).unwrap();

        assert_eq!(parsed.title, Some("Main Title".to_string()));
        assert!(parsed.text.contains("paragraph with some text"));
        assert!(parsed.text.contains("Section One"));
        assert!(parsed.text.contains("inline code"));
        assert!(parsed.text.contains("• Item 1"));
    }

    #[test]
    fn test_title_only_from_first_h1() {
        let parsed = parse_markdown("## Not a title\n\n# Real Title\n\n# Second H1").unwrap();
        assert_eq!(parsed.title, Some("Real Title".to_string()));
    }

    #[test]
    fn test_code_block_text_survives() {
        let parsed = parse_markdown("```python\nprint('hello')\n```\n\nafter").unwrap();
        assert!(parsed.text.contains("print('hello')"));
        assert!(parsed.text.contains("after"));
    }
}
