//! Salvage strategies for recovering text from raw PDF bytes.
//!
//! Every strategy has the same shape: `fn(&[u8]) -> Option<String>`. Each is
//! a lossy heuristic; a returned string is a candidate, not a guarantee. The
//! chain in `Extractor` decides whether a candidate is good enough.

use regex::bytes::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Printable ASCII plus newline
fn is_printable(b: u8) -> bool {
    (0x20..0x7f).contains(&b) || b == b'\n'
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Collapse runs of whitespace, preserving single newlines
fn squeeze(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    let mut pending_newline = false;

    for c in text.chars() {
        if c == '\n' {
            pending_newline = true;
        } else if c.is_whitespace() {
            pending_space = true;
        } else {
            if pending_newline && !out.is_empty() {
                out.push('\n');
            } else if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            pending_newline = false;
            out.push(c);
        }
    }

    out
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Decode a PDF literal string body: `\(`/`\)`/`\\` escapes, control
/// escapes, and 1-3 digit octal sequences. Unknown bytes become spaces.
fn unescape_literal(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        let b = raw[i];
        if b == b'\\' && i + 1 < raw.len() {
            let next = raw[i + 1];
            i += 2;
            match next {
                b'(' => out.push('('),
                b')' => out.push(')'),
                b'\\' => out.push('\\'),
                b'n' => out.push('\n'),
                b'r' | b't' => out.push(' '),
                b'b' | b'f' => {}
                b'0'..=b'7' => {
                    // Up to two more octal digits
                    let mut value = (next - b'0') as u32;
                    let mut taken = 0;
                    while taken < 2 && i < raw.len() && raw[i].is_ascii_digit() && raw[i] < b'8' {
                        value = value * 8 + (raw[i] - b'0') as u32;
                        i += 1;
                        taken += 1;
                    }
                    if let Some(c) = char::from_u32(value) {
                        if !c.is_control() || c == '\n' {
                            out.push(c);
                        } else {
                            out.push(' ');
                        }
                    }
                }
                // Line continuation and anything else: drop the backslash
                _ => {
                    if is_printable(next) {
                        out.push(next as char);
                    }
                }
            }
        } else {
            if is_printable(b) {
                out.push(b as char);
            } else {
                out.push(' ');
            }
            i += 1;
        }
    }

    out
}

/// Pull parenthesized string bodies out of a byte segment, honoring nesting
/// and escapes.
fn paren_strings(segment: &[u8]) -> Vec<String> {
    let mut strings = Vec::new();
    let mut i = 0;

    while i < segment.len() {
        if segment[i] != b'(' {
            i += 1;
            continue;
        }

        let mut depth = 1;
        let start = i + 1;
        let mut j = start;
        while j < segment.len() && depth > 0 {
            match segment[j] {
                b'\\' => j += 1, // skip escaped byte
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ => {}
            }
            j += 1;
        }

        if depth == 0 {
            let body = &segment[start..j - 1];
            let decoded = unescape_literal(body);
            if !decoded.trim().is_empty() {
                strings.push(decoded);
            }
            i = j;
        } else {
            break; // unterminated string, nothing more to find
        }
    }

    strings
}

/// Strategy 1: parse `BT … ET` text-object blocks and extract the literal
/// strings their show-text operators carry.
pub fn text_objects(bytes: &[u8]) -> Option<String> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(bt) = find(bytes, b"BT", cursor) {
        let Some(et) = find(bytes, b"ET", bt + 2) else {
            break;
        };
        let strings = paren_strings(&bytes[bt + 2..et]);
        if !strings.is_empty() {
            blocks.push(strings.join(" "));
        }
        cursor = et + 2;
    }

    non_empty(squeeze(&blocks.join("\n")))
}

/// Strategy 2: pull `stream … endstream` bodies and keep the ASCII-heavy
/// ones, longest first. Compressed streams fail the printable-ratio test and
/// are discarded.
pub fn content_streams(bytes: &[u8]) -> Option<String> {
    let mut candidates: Vec<String> = Vec::new();
    let mut cursor = 0;

    while let Some(start) = find(bytes, b"stream", cursor) {
        let body_start = start + b"stream".len();
        let Some(end) = find(bytes, b"endstream", body_start) else {
            break;
        };
        cursor = end + b"endstream".len();

        let mut body = &bytes[body_start..end];
        // EOL after the stream keyword is not part of the data
        while body.first().is_some_and(|b| *b == b'\r' || *b == b'\n') {
            body = &body[1..];
        }
        if body.len() < 20 {
            continue;
        }

        let printable = body.iter().filter(|b| is_printable(**b)).count();
        if (printable as f64) / (body.len() as f64) < 0.6 {
            continue;
        }

        let text: String = body
            .iter()
            .map(|&b| if is_printable(b) { b as char } else { ' ' })
            .collect();
        let cleaned = squeeze(&text);
        if !cleaned.is_empty() {
            candidates.push(cleaned);
        }
    }

    candidates.sort_by_key(|c| std::cmp::Reverse(c.len()));
    candidates.truncate(8);
    non_empty(candidates.join("\n\n"))
}

/// Strategy 3: scan for standalone parenthesized strings anywhere in the
/// byte stream, outside any recognizable structure.
pub fn literal_strings(bytes: &[u8]) -> Option<String> {
    static PAREN: OnceLock<Regex> = OnceLock::new();
    let re = PAREN.get_or_init(|| Regex::new(r"\(([^()\\]{2,500})\)").expect("valid regex"));

    let mut parts = Vec::new();
    for caps in re.captures_iter(bytes) {
        let body = &caps[1];
        let printable = body.iter().filter(|b| is_printable(**b)).count();
        if printable * 10 < body.len() * 8 {
            continue;
        }
        let decoded = unescape_literal(body);
        if decoded.chars().any(|c| c.is_alphabetic()) {
            parts.push(decoded);
        }
    }

    non_empty(squeeze(&parts.join(" ")))
}

/// Strategy 4: decode using guessed encodings, in order: UTF-16BE byte
/// pairs, literal `\uXXXX` sequences, Latin-1 printable filtering.
pub fn guessed_encodings(bytes: &[u8]) -> Option<String> {
    if let Some(text) = decode_utf16be(bytes) {
        return Some(text);
    }
    if let Some(text) = decode_unicode_escapes(bytes) {
        return Some(text);
    }
    decode_latin1_filtered(bytes)
}

fn decode_utf16be(bytes: &[u8]) -> Option<String> {
    if bytes.len() < 64 {
        return None;
    }

    let pairs = bytes.len() / 2;
    let ascii_pairs = bytes
        .chunks_exact(2)
        .filter(|p| p[0] == 0 && is_printable(p[1]))
        .count();
    // A real UTF-16BE text region has a zero high byte for most Latin chars
    if ascii_pairs * 10 < pairs * 3 {
        return None;
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|p| u16::from_be_bytes([p[0], p[1]]))
        .collect();
    let decoded: String = char::decode_utf16(units.into_iter())
        .map(|r| r.unwrap_or(' '))
        .map(|c| {
            if c.is_control() && c != '\n' {
                ' '
            } else {
                c
            }
        })
        .collect();

    non_empty(squeeze(&decoded))
}

fn decode_unicode_escapes(bytes: &[u8]) -> Option<String> {
    static UESC: OnceLock<Regex> = OnceLock::new();
    let re = UESC.get_or_init(|| Regex::new(r"\\u([0-9a-fA-F]{4})").expect("valid regex"));

    let mut decoded = String::new();
    let mut matches = 0usize;
    for caps in re.captures_iter(bytes) {
        let hex = std::str::from_utf8(&caps[1]).ok()?;
        let value = u32::from_str_radix(hex, 16).ok()?;
        if let Some(c) = char::from_u32(value) {
            if !c.is_control() {
                decoded.push(c);
            } else {
                decoded.push(' ');
            }
        }
        matches += 1;
    }

    // A handful of stray \uXXXX sequences is noise, not a text body
    if matches < 16 {
        return None;
    }
    non_empty(squeeze(&decoded))
}

fn decode_latin1_filtered(bytes: &[u8]) -> Option<String> {
    // Encoding statistics mean nothing on tiny buffers
    if bytes.len() < 1024 {
        return None;
    }
    let text: String = bytes
        .iter()
        .map(|&b| {
            if is_printable(b) {
                b as char
            } else if (0xa0..=0xff).contains(&b) {
                b as char // Latin-1 upper range maps 1:1 to Unicode
            } else {
                ' '
            }
        })
        .collect();

    let cleaned = squeeze(&text);
    let letters = cleaned.chars().filter(|c| c.is_alphabetic()).count();
    let total = cleaned.chars().count();
    if total == 0 || letters * 10 < total * 3 {
        return None;
    }
    non_empty(cleaned)
}

/// Strategy 5: character-frequency fallback. Keep only the most frequent
/// printable bytes and turn everything else into whitespace. Last resort;
/// output is word soup at best.
pub fn char_frequency(bytes: &[u8]) -> Option<String> {
    if bytes.len() < 1024 {
        return None;
    }
    let mut counts: HashMap<u8, usize> = HashMap::new();
    for &b in bytes {
        if (0x21..0x7f).contains(&b) {
            *counts.entry(b).or_insert(0) += 1;
        }
    }
    if counts.is_empty() {
        return None;
    }

    let mut ranked: Vec<(u8, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(48);
    let keep: Vec<u8> = ranked.into_iter().map(|(b, _)| b).collect();

    let text: String = bytes
        .iter()
        .map(|&b| {
            if keep.contains(&b) {
                b as char
            } else {
                ' '
            }
        })
        .collect();

    non_empty(squeeze(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_octal_and_controls() {
        let decoded = unescape_literal(b"caf\\351 \\(quoted\\) line\\nnext");
        assert_eq!(decoded, "café (quoted) line\nnext");
    }

    #[test]
    fn test_paren_strings_nesting() {
        let strings = paren_strings(b"(outer (inner) tail) junk (second)");
        assert_eq!(strings, vec!["outer (inner) tail", "second"]);
    }

    #[test]
    fn test_text_objects_extracts_block_strings() {
        let bytes = b"%PDF-1.4 BT /F1 12 Tf (Hello there) Tj (general reader) Tj ET trailer";
        let text = text_objects(bytes).unwrap();
        assert_eq!(text, "Hello there general reader");
    }

    #[test]
    fn test_text_objects_none_without_blocks() {
        assert!(text_objects(b"no text operators here").is_none());
    }

    #[test]
    fn test_content_streams_keeps_ascii_heavy() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"stream\n");
        bytes.extend_from_slice(b"This stream is plain readable ASCII text, long enough to keep.");
        bytes.extend_from_slice(b"endstream stream\n");
        bytes.extend_from_slice(&[0u8; 64]); // binary stream, discarded
        bytes.extend_from_slice(b"endstream");

        let text = content_streams(&bytes).unwrap();
        assert!(text.contains("plain readable ASCII"));
        assert!(!text.contains('\u{0}'));
    }

    #[test]
    fn test_literal_strings_scan() {
        let bytes = b"garbage \x01\x02 (scattered words here) more \xff (and some others)";
        let text = literal_strings(bytes).unwrap();
        assert!(text.contains("scattered words here"));
        assert!(text.contains("and some others"));
    }

    #[test]
    fn test_utf16be_heuristic() {
        let source = "Wide characters spell out a perfectly ordinary sentence.";
        let bytes: Vec<u8> = source
            .encode_utf16()
            .flat_map(|u| u.to_be_bytes())
            .collect();
        let text = guessed_encodings(&bytes).unwrap();
        assert!(text.contains("ordinary sentence"));
    }

    #[test]
    fn test_unicode_escape_decoding() {
        let mut bytes = Vec::new();
        for c in "Escaped text survives the trip through".chars() {
            bytes.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
        }
        let text = guessed_encodings(&bytes).unwrap();
        assert!(text.contains("survives the trip"));
    }

    #[test]
    fn test_char_frequency_drops_rare_noise() {
        let mut bytes = Vec::new();
        for _ in 0..40 {
            bytes.extend_from_slice(b"the common words keep repeating ");
        }
        bytes.extend_from_slice(&[0x01, 0x02, 0x03]);
        let text = char_frequency(&bytes).unwrap();
        assert!(text.contains("common words"));
    }
}
