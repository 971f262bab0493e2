//! scrivener - a CLI for operating a document ingestion pipeline
//!
//! This crate provides:
//! - CLI commands for importing documents (local files, URLs, Google Drive)
//! - A layered PDF text salvage chain for scans and malformed files
//! - Configurable chunking strategies and embedding generation
//! - A SQLite metadata store tracking documents, chunks, and vectors

pub mod chunk;
pub mod commands;
pub mod config;
pub mod drive;
pub mod embed;
pub mod error;
pub mod extract;
pub mod meta;
pub mod parse;
pub mod progress;
pub mod proxy;

pub use config::Config;
pub use error::{Error, Result};
