//! Text chunking strategies
//!
//! Splits a document's text into ordered chunks per a selected strategy.
//! Offsets are character positions (not bytes) in the original text. No
//! strategy guarantees exact chunk-size bounds; chunks are best-effort spans
//! sized for embedding.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// How far past the midpoint the recursive strategy searches for punctuation
const RECURSIVE_BOUNDARY_WINDOW: usize = 100;

/// Chunk splitting strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    #[default]
    FixedSize,
    Paragraph,
    Sentence,
    Recursive,
    Semantic,
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkStrategy::FixedSize => write!(f, "fixed_size"),
            ChunkStrategy::Paragraph => write!(f, "paragraph"),
            ChunkStrategy::Sentence => write!(f, "sentence"),
            ChunkStrategy::Recursive => write!(f, "recursive"),
            ChunkStrategy::Semantic => write!(f, "semantic"),
        }
    }
}

impl FromStr for ChunkStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fixed_size" | "fixed" => Ok(ChunkStrategy::FixedSize),
            "paragraph" => Ok(ChunkStrategy::Paragraph),
            "sentence" => Ok(ChunkStrategy::Sentence),
            "recursive" => Ok(ChunkStrategy::Recursive),
            "semantic" => Ok(ChunkStrategy::Semantic),
            _ => Err(Error::Chunking(format!("Unknown chunk strategy: {}", s))),
        }
    }
}

/// Options controlling a split
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    pub strategy: ChunkStrategy,
    /// Target characters per chunk
    pub chunk_size: usize,
    /// Characters carried between adjacent chunks (fixed_size, recursive)
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::FixedSize,
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// A chunk with position metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    /// 0-based position in the document's chunk sequence
    pub index: usize,
    pub text: String,
    /// Character start position in the original text
    pub char_start: usize,
    /// Character end position (exclusive) in the original text
    pub char_end: usize,
    /// Placeholder relevance score, only set by the semantic strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f32>,
}

/// Split text into chunks per the selected strategy.
///
/// Empty input yields no chunks; no produced chunk is ever empty.
pub fn split_text(text: &str, opts: &ChunkOptions) -> Result<Vec<TextChunk>> {
    if opts.chunk_size == 0 {
        return Err(Error::Chunking("chunk_size must be positive".to_string()));
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut chunks = match opts.strategy {
        ChunkStrategy::FixedSize => fixed_size(text, opts.chunk_size, opts.overlap),
        ChunkStrategy::Paragraph => paragraphs(text, false, opts.chunk_size),
        ChunkStrategy::Sentence => sentences(text),
        ChunkStrategy::Recursive => recursive(text, opts.chunk_size, opts.overlap),
        ChunkStrategy::Semantic => paragraphs(text, true, opts.chunk_size),
    };

    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.index = i;
    }

    Ok(chunks)
}

fn make_chunk(text: String, char_start: usize, char_end: usize) -> TextChunk {
    TextChunk {
        index: 0,
        text,
        char_start,
        char_end,
        semantic_score: None,
    }
}

/// Sliding window of `chunk_size` chars advancing by `chunk_size - overlap`.
/// An overlap at or above the chunk size would stall the window, so the
/// advance is clamped to one character.
fn fixed_size(text: &str, chunk_size: usize, overlap: usize) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            let lead = window.chars().take_while(|c| c.is_whitespace()).count();
            let trail = window.chars().rev().take_while(|c| c.is_whitespace()).count();
            chunks.push(make_chunk(trimmed.to_string(), start + lead, end - trail));
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Blank-line split; the semantic variant annotates each paragraph with a
/// placeholder score (the original never computed embedding-based cuts).
fn paragraphs(text: &str, semantic: bool, chunk_size: usize) -> Vec<TextChunk> {
    static PARA_SPLIT: OnceLock<Regex> = OnceLock::new();
    let re = PARA_SPLIT.get_or_init(|| Regex::new(r"\n[ \t]*\n+").expect("valid regex"));

    let offsets = CharOffsets::new(text);
    let mut chunks = Vec::new();
    let mut cursor = 0;

    let mut push_segment = |byte_start: usize, byte_end: usize, chunks: &mut Vec<TextChunk>| {
        let segment = &text[byte_start..byte_end];
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            return;
        }
        let lead = trimmed.as_ptr() as usize - segment.as_ptr() as usize;
        let start = offsets.char_at(byte_start + lead);
        let end = start + trimmed.chars().count();
        let mut chunk = make_chunk(trimmed.to_string(), start, end);
        if semantic {
            chunk.semantic_score = Some(placeholder_score(trimmed, chunk_size));
        }
        chunks.push(chunk);
    };

    for sep in re.find_iter(text) {
        push_segment(cursor, sep.start(), &mut chunks);
        cursor = sep.end();
    }
    push_segment(cursor, text.len(), &mut chunks);

    chunks
}

/// Deterministic stand-in for a real semantic boundary score: paragraphs
/// near the target chunk size score highest.
fn placeholder_score(paragraph: &str, chunk_size: usize) -> f32 {
    let len = paragraph.chars().count().min(chunk_size) as f32;
    len / chunk_size.max(1) as f32
}

/// Split on `.!?` boundaries, one chunk per sentence
fn sentences(text: &str) -> Vec<TextChunk> {
    static SENTENCE: OnceLock<Regex> = OnceLock::new();
    let re = SENTENCE.get_or_init(|| {
        Regex::new(r#"[^.!?]+[.!?]+["')\]]*"#).expect("valid regex")
    });

    let offsets = CharOffsets::new(text);
    let mut chunks = Vec::new();
    let mut last_end = 0;

    let mut push = |segment: &str, byte_start: usize, chunks: &mut Vec<TextChunk>| {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            return;
        }
        let lead = trimmed.as_ptr() as usize - segment.as_ptr() as usize;
        let start = offsets.char_at(byte_start + lead);
        let end = start + trimmed.chars().count();
        chunks.push(make_chunk(trimmed.to_string(), start, end));
    };

    for m in re.find_iter(text) {
        push(m.as_str(), m.start(), &mut chunks);
        last_end = m.end();
    }

    // Trailing text without a terminator still becomes a chunk
    if last_end < text.len() {
        push(&text[last_end..], last_end, &mut chunks);
    }

    chunks
}

/// Midpoint split preferring a nearby punctuation boundary, recursing until
/// each piece is at most half the target size. `overlap` chars from the end
/// of the previous piece are carried back into the next chunk.
fn recursive(text: &str, chunk_size: usize, overlap: usize) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();

    if chars.len() <= chunk_size {
        return vec![make_chunk(text.to_string(), 0, chars.len())];
    }

    let leaf_max = (chunk_size / 2).max(1);
    let mut pieces: Vec<(usize, usize)> = Vec::new();
    split_recursive(&chars, 0, leaf_max, &mut pieces);

    let mut chunks = Vec::new();
    for (i, &(start, end)) in pieces.iter().enumerate() {
        let carry = if i == 0 { 0 } else { overlap.min(start) };
        let span_start = start - carry;
        let piece: String = chars[span_start..end].iter().collect();
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lead = piece.chars().take_while(|c| c.is_whitespace()).count();
        let trail = piece
            .chars()
            .rev()
            .take_while(|c| c.is_whitespace())
            .count();
        chunks.push(make_chunk(
            trimmed.to_string(),
            span_start + lead,
            end - trail,
        ));
    }

    chunks
}

fn split_recursive(chars: &[char], base: usize, leaf_max: usize, out: &mut Vec<(usize, usize)>) {
    if chars.len() <= leaf_max {
        if !chars.is_empty() {
            out.push((base, base + chars.len()));
        }
        return;
    }

    let mid = chars.len() / 2;
    let window_end = (mid + RECURSIVE_BOUNDARY_WINDOW).min(chars.len() - 1);

    // Prefer a punctuation boundary shortly after the midpoint; if the window
    // has none, split exactly at the midpoint (which can land mid-word).
    let split = (mid..window_end)
        .find(|&i| matches!(chars[i], '.' | '!' | '?' | ';' | ':' | '\n'))
        .map(|i| i + 1)
        .unwrap_or(mid);

    split_recursive(&chars[..split], base, leaf_max, out);
    split_recursive(&chars[split..], base + split, leaf_max, out);
}

/// Byte-offset to char-offset translation for regex match positions
struct CharOffsets {
    /// Byte index of each char, ascending
    bytes: Vec<usize>,
}

impl CharOffsets {
    fn new(text: &str) -> Self {
        Self {
            bytes: text.char_indices().map(|(b, _)| b).collect(),
        }
    }

    /// Char position of a byte offset (must be a char boundary)
    fn char_at(&self, byte: usize) -> usize {
        self.bytes.partition_point(|&b| b < byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(strategy: ChunkStrategy, chunk_size: usize, overlap: usize) -> ChunkOptions {
        ChunkOptions {
            strategy,
            chunk_size,
            overlap,
        }
    }

    const SAMPLE: &str = "The quick brown fox jumps over the lazy dog. \
It was the best of times! Was it the worst of times?\n\n\
A second paragraph follows here, with more words to split across chunks \
and enough length to make the windows interesting.";

    fn all_strategies() -> Vec<ChunkStrategy> {
        vec![
            ChunkStrategy::FixedSize,
            ChunkStrategy::Paragraph,
            ChunkStrategy::Sentence,
            ChunkStrategy::Recursive,
            ChunkStrategy::Semantic,
        ]
    }

    #[test]
    fn test_no_empty_chunks_any_strategy() {
        for strategy in all_strategies() {
            let chunks = split_text(SAMPLE, &opts(strategy, 60, 10)).unwrap();
            assert!(!chunks.is_empty(), "{} produced nothing", strategy);
            for chunk in &chunks {
                assert!(!chunk.text.trim().is_empty(), "{} made an empty chunk", strategy);
            }
        }
    }

    #[test]
    fn test_concatenation_covers_input_words() {
        for strategy in all_strategies() {
            let chunks = split_text(SAMPLE, &opts(strategy, 60, 10)).unwrap();
            let joined: String = chunks
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            for word in SAMPLE.split_whitespace() {
                assert!(
                    joined.contains(word.trim_matches(|c: char| !c.is_alphanumeric())),
                    "{} dropped word '{}'",
                    strategy,
                    word
                );
            }
        }
    }

    #[test]
    fn test_chunk_indexes_are_sequential() {
        let chunks = split_text(SAMPLE, &opts(ChunkStrategy::Sentence, 100, 0)).unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_fixed_size_window_and_step() {
        let text = "abcdefghij";
        let chunks = split_text(text, &opts(ChunkStrategy::FixedSize, 4, 2)).unwrap();
        assert_eq!(chunks[0].text, "abcd");
        assert_eq!(chunks[1].text, "cdef");
        assert_eq!(chunks[0].char_start, 0);
        assert_eq!(chunks[1].char_start, 2);
    }

    #[test]
    fn test_fixed_size_offsets_exclude_trimmed_whitespace() {
        let text = "  abc   def  ";
        let chunks = split_text(text, &opts(ChunkStrategy::FixedSize, 5, 0)).unwrap();
        let all: Vec<char> = text.chars().collect();
        for chunk in &chunks {
            let span: String = all[chunk.char_start..chunk.char_end].iter().collect();
            assert_eq!(span, chunk.text);
        }
        assert_eq!(chunks[0].text, "abc");
        assert_eq!(chunks[0].char_start, 2);
        assert_eq!(chunks[0].char_end, 5);
    }

    #[test]
    fn test_fixed_size_overlap_at_least_chunk_size_terminates() {
        // overlap >= chunk_size would stall the window without the clamp
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = split_text(text, &opts(ChunkStrategy::FixedSize, 5, 5)).unwrap();
        assert!(!chunks.is_empty());
        let more = split_text(text, &opts(ChunkStrategy::FixedSize, 5, 9)).unwrap();
        assert!(!more.is_empty());
    }

    #[test]
    fn test_paragraph_split_positions() {
        let text = "First paragraph.\n\nSecond paragraph.";
        let chunks = split_text(text, &opts(ChunkStrategy::Paragraph, 1000, 0)).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "First paragraph.");
        assert_eq!(chunks[1].text, "Second paragraph.");
        assert_eq!(chunks[1].char_start, 18);
        assert!(chunks.iter().all(|c| c.semantic_score.is_none()));
    }

    #[test]
    fn test_sentence_split() {
        let text = "One sentence. Another one! A third? Trailing fragment";
        let chunks = split_text(text, &opts(ChunkStrategy::Sentence, 1000, 0)).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "One sentence.",
                "Another one!",
                "A third?",
                "Trailing fragment"
            ]
        );
    }

    #[test]
    fn test_recursive_short_input_single_chunk() {
        let text = "0123456789";
        let chunks = split_text(text, &opts(ChunkStrategy::Recursive, 1000, 50)).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].char_start, 0);
        assert_eq!(chunks[0].char_end, 10);
    }

    #[test]
    fn test_recursive_prefers_punctuation_boundary() {
        // A period shortly after the midpoint should become a piece boundary
        let text = format!("{}.{}", "a".repeat(50), "b".repeat(48));
        let chunks = split_text(&text, &opts(ChunkStrategy::Recursive, 90, 0)).unwrap();
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().any(|c| c.text.ends_with('.')));
        // No piece mixes text from both sides of the boundary
        assert!(chunks
            .iter()
            .all(|c| !(c.text.contains('a') && c.text.contains('b'))));
    }

    #[test]
    fn test_recursive_overlap_carries_back() {
        let text = format!("{}. {}", "x".repeat(100), "y".repeat(100));
        let chunks = split_text(&text, &opts(ChunkStrategy::Recursive, 100, 10)).unwrap();
        assert!(chunks.len() >= 2);
        // Later chunks start before the end of the previous piece
        assert!(chunks[1].char_start < chunks[0].char_end);
    }

    #[test]
    fn test_semantic_is_paragraph_with_score() {
        let text = "Alpha block.\n\nBeta block continues with more words.";
        let para = split_text(text, &opts(ChunkStrategy::Paragraph, 100, 0)).unwrap();
        let sem = split_text(text, &opts(ChunkStrategy::Semantic, 100, 0)).unwrap();
        assert_eq!(para.len(), sem.len());
        for (p, s) in para.iter().zip(sem.iter()) {
            assert_eq!(p.text, s.text);
            let score = s.semantic_score.expect("semantic score set");
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        for strategy in all_strategies() {
            assert!(split_text("", &opts(strategy, 100, 10)).unwrap().is_empty());
            assert!(split_text("  \n\n  ", &opts(strategy, 100, 10))
                .unwrap()
                .is_empty());
        }
    }

    #[test]
    fn test_multibyte_text_offsets_are_chars() {
        let text = "héllo wörld. Ünïcode everywhere hére töo.";
        let chunks = split_text(text, &opts(ChunkStrategy::Sentence, 100, 0)).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].char_start, 0);
        // Offsets count chars, so the second sentence starts at char 13
        assert_eq!(chunks[1].char_start, 13);
    }

    #[test]
    fn test_strategy_parse_and_display() {
        assert_eq!(
            "fixed_size".parse::<ChunkStrategy>().unwrap(),
            ChunkStrategy::FixedSize
        );
        assert_eq!(ChunkStrategy::Semantic.to_string(), "semantic");
        assert!("quantum".parse::<ChunkStrategy>().is_err());
    }
}
