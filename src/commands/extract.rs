//! Extract command implementation (debugging aid)
//!
//! Runs the salvage chain against a local PDF and reports which strategy
//! won, without touching the database.

use crate::error::Result;
use crate::extract::{ExtractOutcome, Extractor};
use crate::progress::add_progress_bar;
use serde::{Deserialize, Serialize};
use std::path::Path;

const PREVIEW_CHARS: usize = 400;

/// Extraction report for a single file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractReport {
    pub file: String,
    pub bytes: usize,
    pub strategy: Option<String>,
    pub chars: usize,
    pub preview: Option<String>,
    pub unreadable_reason: Option<String>,
}

/// Run extraction on a local file and report the outcome
pub fn cmd_extract(path: &Path) -> Result<ExtractReport> {
    let bytes = std::fs::read(path)?;
    let extractor = Extractor::new();

    let bar = add_progress_bar(5, "Trying strategies");
    let outcome = extractor.extract_with(&bytes, |p| {
        bar.set_message(p.stage.to_string());
        bar.set_position(p.completed as u64);
    });
    bar.finish_and_clear();

    let report = match outcome {
        ExtractOutcome::Extracted { text, strategy } => ExtractReport {
            file: path.display().to_string(),
            bytes: bytes.len(),
            strategy: Some(strategy.to_string()),
            chars: text.chars().count(),
            preview: Some(text.chars().take(PREVIEW_CHARS).collect()),
            unreadable_reason: None,
        },
        ExtractOutcome::Unreadable { reason } => ExtractReport {
            file: path.display().to_string(),
            bytes: bytes.len(),
            strategy: None,
            chars: 0,
            preview: None,
            unreadable_reason: Some(reason),
        },
    };

    Ok(report)
}

/// Print extraction report to console
pub fn print_extract_report(report: &ExtractReport) {
    println!("\n🔍 Extraction report\n");
    println!("File: {} ({} bytes)", report.file, report.bytes);

    match (&report.strategy, &report.unreadable_reason) {
        (Some(strategy), _) => {
            println!("Strategy: {}", strategy);
            println!("Characters: {}", report.chars);
            if let Some(ref preview) = report.preview {
                println!("\nPreview:\n{}", preview);
                if report.chars > PREVIEW_CHARS {
                    println!("…");
                }
            }
        }
        (None, Some(reason)) => {
            println!("Unreadable: {}", reason);
        }
        (None, None) => {}
    }
}
