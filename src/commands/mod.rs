//! CLI commands implementation

pub mod config;
pub mod docs;
pub mod embed;
pub mod extract;
pub mod ingest;
pub mod init;
pub mod probe;
pub mod status;

pub use config::*;
pub use docs::*;
pub use embed::*;
pub use extract::*;
pub use ingest::*;
pub use init::*;
pub use probe::*;
pub use status::*;
