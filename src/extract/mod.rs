//! Heuristic PDF byte-to-text extraction
//!
//! Given raw PDF bytes, produce a best-effort plain-text approximation. This
//! is lossy salvage, not a PDF parser: an ordered chain of strategies is
//! tried and the first one yielding enough plausible text wins. Encrypted or
//! scanned PDFs exhaust every strategy and end in `Unreadable`, which is the
//! expected terminal outcome, not an error.

mod strategies;

pub use strategies::*;

use unicode_segmentation::UnicodeSegmentation;

/// Characters of plausible text required to accept a strategy outright
pub const ACCEPT_THRESHOLD: usize = 100;

/// Characters below which salvage is not worth returning
pub const SALVAGE_THRESHOLD: usize = 50;

/// A single salvage strategy. All strategies share the same signature so the
/// chain stays a plain ordered list.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub run: fn(&[u8]) -> Option<String>,
}

/// Milestone reported once per strategy attempt
#[derive(Debug, Clone, Copy)]
pub struct ExtractProgress {
    pub stage: &'static str,
    pub completed: usize,
    pub total: usize,
}

/// Result of an extraction attempt. `Unreadable` is a user-visible outcome,
/// not an error: callers record the reason and move on.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    Extracted {
        text: String,
        strategy: &'static str,
    },
    Unreadable {
        reason: String,
    },
}

impl ExtractOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            ExtractOutcome::Extracted { text, .. } => Some(text),
            ExtractOutcome::Unreadable { .. } => None,
        }
    }

    pub fn is_unreadable(&self) -> bool {
        matches!(self, ExtractOutcome::Unreadable { .. })
    }
}

/// Extraction context holding the ordered strategy chain and thresholds.
/// Construct one per use site; there is no shared global state.
pub struct Extractor {
    accept_threshold: usize,
    salvage_threshold: usize,
    strategies: Vec<Strategy>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// Full strategy chain with the standard thresholds
    pub fn new() -> Self {
        Self {
            accept_threshold: ACCEPT_THRESHOLD,
            salvage_threshold: SALVAGE_THRESHOLD,
            strategies: vec![
                Strategy {
                    name: "text_objects",
                    run: text_objects,
                },
                Strategy {
                    name: "content_streams",
                    run: content_streams,
                },
                Strategy {
                    name: "literal_strings",
                    run: literal_strings,
                },
                Strategy {
                    name: "guessed_encodings",
                    run: guessed_encodings,
                },
                Strategy {
                    name: "char_frequency",
                    run: char_frequency,
                },
            ],
        }
    }

    /// Override thresholds (tests, unusually small documents)
    pub fn with_thresholds(mut self, accept: usize, salvage: usize) -> Self {
        self.accept_threshold = accept;
        self.salvage_threshold = salvage;
        self
    }

    /// Run the chain without progress reporting
    pub fn extract(&self, bytes: &[u8]) -> ExtractOutcome {
        self.extract_with(bytes, |_| {})
    }

    /// Run the chain, invoking `progress` synchronously once per strategy
    pub fn extract_with<F>(&self, bytes: &[u8], mut progress: F) -> ExtractOutcome
    where
        F: FnMut(ExtractProgress),
    {
        if !bytes.starts_with(b"%PDF-") {
            return ExtractOutcome::Unreadable {
                reason: "not a PDF document (missing %PDF- header)".to_string(),
            };
        }

        let total = self.strategies.len();
        let mut best: Option<(&'static str, String, usize)> = None;

        for (i, strategy) in self.strategies.iter().enumerate() {
            progress(ExtractProgress {
                stage: strategy.name,
                completed: i,
                total,
            });

            let Some(candidate) = (strategy.run)(bytes) else {
                continue;
            };
            let score = plausible_chars(&candidate);

            if score >= self.accept_threshold {
                progress(ExtractProgress {
                    stage: strategy.name,
                    completed: total,
                    total,
                });
                return ExtractOutcome::Extracted {
                    text: candidate,
                    strategy: strategy.name,
                };
            }

            if best.as_ref().map_or(true, |(_, _, s)| score > *s) {
                best = Some((strategy.name, candidate, score));
            }
        }

        progress(ExtractProgress {
            stage: "done",
            completed: total,
            total,
        });

        // No strategy cleared the bar; return the best salvage if it is at
        // least marginally useful.
        if let Some((name, text, score)) = best {
            if score >= self.salvage_threshold {
                return ExtractOutcome::Extracted {
                    text,
                    strategy: name,
                };
            }
        }

        ExtractOutcome::Unreadable {
            reason: "could not extract text from PDF (all strategies exhausted; \
                     the file may be encrypted or scanned)"
                .to_string(),
        }
    }
}

/// Plausible character count of a candidate: the trimmed length if the text
/// has word-like structure, zero otherwise.
fn plausible_chars(text: &str) -> usize {
    let words: Vec<&str> = text.unicode_words().collect();
    if words.is_empty() {
        return 0;
    }
    let total: usize = words.iter().map(|w| w.chars().count()).sum();
    let avg = total / words.len();
    if avg == 0 || avg > 24 {
        return 0;
    }
    text.trim().chars().count()
}
