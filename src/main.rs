//! scrivener CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use scrivener::{
    commands::{
        cmd_clear_embeddings, cmd_config_delete, cmd_config_get, cmd_config_set, cmd_config_show,
        cmd_embed, cmd_extract, cmd_ingest_dir, cmd_ingest_drive, cmd_ingest_pdf, cmd_ingest_url,
        cmd_init, cmd_list_documents, cmd_probe, cmd_rechunk, cmd_remove_document,
        cmd_retry_document, cmd_status, print_config_show, print_config_view, print_documents,
        print_embed_stats, print_extract_report, print_ingest_stats, print_probe_report,
        print_status, InitOptions,
    },
    config::Config,
    error::Result,
    meta::{DocumentStatus, MetaDb},
    progress::LogWriterFactory,
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "scrivener")]
#[command(version, about = "Document ingestion pipeline: PDF salvage, chunking, embeddings", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize scrivener configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Import documents into the pipeline
    Ingest {
        #[command(subcommand)]
        source: IngestSource,
    },

    /// Run PDF extraction against a local file without storing anything
    Extract {
        /// Path to the PDF file
        path: PathBuf,
    },

    /// Re-split a stored document with the current chunking settings
    Chunk {
        /// Document ID
        doc_id: String,
    },

    /// Generate embeddings for chunks that have none yet
    Embed {
        /// Only embed this document's chunks
        #[arg(long)]
        doc: Option<String>,
    },

    /// Inspect and manage stored documents
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Read and write pipeline configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Test connectivity to the PDF proxy
    Probe,

    /// Show system status
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum IngestSource {
    /// Ingest a local PDF file
    Pdf {
        /// Path to the PDF file
        path: PathBuf,

        /// Title override (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Ingest a PDF from a URL (fetched through the proxy)
    Url {
        /// URL to ingest (Drive viewer links are rewritten automatically)
        url: String,

        /// Title override
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Import all files from a Google Drive folder
    Drive {
        /// Folder ID (defaults to the one in the credentials file)
        folder: Option<String>,
    },

    /// Ingest text files from a local directory
    Dir {
        /// Directory to walk
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum DocsAction {
    /// List stored documents
    List {
        /// Filter by status (pending, processing, completed, failed)
        #[arg(long)]
        status: Option<String>,
    },

    /// Remove a document and everything derived from it
    Remove {
        /// Document ID
        doc_id: String,
    },

    /// Re-run the pipeline for a failed document
    Retry {
        /// Document ID
        doc_id: String,
    },

    /// Delete all stored embeddings (chunks are kept)
    ClearEmbeddings,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show one configuration domain
    Get {
        /// Domain key (chunking, embedding, chat)
        key: String,
    },

    /// Validate and store a configuration domain as JSON
    Set {
        /// Domain key
        key: String,

        /// JSON value for the domain
        value: String,
    },

    /// Delete a stored domain, reverting it to defaults
    Delete {
        /// Domain key
        key: String,
    },

    /// Show all configuration domains
    Show,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // Handle init command specially (doesn't need existing config)
    if let Commands::Init { force } = cli.command {
        return handle_init(cli.config, force).await;
    }

    // Handle completions command (doesn't need config/db)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "scrivener", &mut std::io::stdout());
        return Ok(());
    }

    // Load configuration
    let config = load_config(cli.config.as_deref())?;

    // Open the metadata database
    let db = MetaDb::open(&config.paths.db_file).await?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Ingest { source } => {
            let stats = match source {
                IngestSource::Pdf { path, title } => {
                    cmd_ingest_pdf(&config, &db, &path, title).await?
                }
                IngestSource::Url { url, title } => {
                    cmd_ingest_url(&config, &db, &url, title).await?
                }
                IngestSource::Drive { folder } => {
                    cmd_ingest_drive(&config, &db, folder.as_deref()).await?
                }
                IngestSource::Dir { path } => cmd_ingest_dir(&config, &db, &path).await?,
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_ingest_stats(&stats);
            }
        }

        Commands::Extract { path } => {
            let report = cmd_extract(&path)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_extract_report(&report);
            }
        }

        Commands::Chunk { doc_id } => {
            let chunks = cmd_rechunk(&db, &doc_id).await?;

            if cli.json {
                println!(r#"{{"doc_id": "{}", "chunks": {}}}"#, doc_id, chunks);
            } else {
                println!("✓ Re-chunked document {} into {} chunks", doc_id, chunks);
            }
        }

        Commands::Embed { doc } => {
            let stats = cmd_embed(&config, &db, doc.as_deref()).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_embed_stats(&stats);
            }
        }

        Commands::Docs { action } => {
            handle_docs_action(&config, &db, action, cli.json).await?;
        }

        Commands::Config { action } => {
            handle_config_action(&db, action, cli.json).await?;
        }

        Commands::Probe => {
            let report = cmd_probe(&config).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_probe_report(&report);
            }
        }

        Commands::Status => {
            let status = cmd_status(&config, &db).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}

async fn handle_docs_action(
    config: &Config,
    db: &MetaDb,
    action: DocsAction,
    json: bool,
) -> Result<()> {
    match action {
        DocsAction::List { status } => {
            let status = status.as_deref().map(str::parse::<DocumentStatus>).transpose()?;
            let docs = cmd_list_documents(db, status).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&docs)?);
            } else {
                print_documents(&docs);
            }
        }

        DocsAction::Remove { doc_id } => {
            cmd_remove_document(db, &doc_id).await?;
            if json {
                println!(r#"{{"status": "ok", "removed": "{}"}}"#, doc_id);
            } else {
                println!("✓ Document '{}' removed", doc_id);
            }
        }

        DocsAction::Retry { doc_id } => {
            let stats = cmd_retry_document(config, db, &doc_id).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_ingest_stats(&stats);
            }
        }

        DocsAction::ClearEmbeddings => {
            let removed = cmd_clear_embeddings(db).await?;
            if json {
                println!(r#"{{"status": "ok", "embeddings_removed": {}}}"#, removed);
            } else {
                println!("✓ Removed {} embeddings", removed);
            }
        }
    }

    Ok(())
}

async fn handle_config_action(db: &MetaDb, action: ConfigAction, json: bool) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let view = cmd_config_get(db, &key).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_config_view(&view);
            }
        }

        ConfigAction::Set { key, value } => {
            let view = cmd_config_set(db, &key, &value).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("✓ Updated '{}'", key);
                print_config_view(&view);
            }
        }

        ConfigAction::Delete { key } => {
            let deleted = cmd_config_delete(db, &key).await?;
            if json {
                println!(r#"{{"status": "ok", "deleted": {}}}"#, deleted);
            } else if deleted {
                println!("✓ '{}' reset to defaults", key);
            } else {
                println!("'{}' was not set; defaults already apply", key);
            }
        }

        ConfigAction::Show => {
            let views = cmd_config_show(db).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                print_config_show(&views);
            }
        }
    }

    Ok(())
}

async fn handle_init(config_arg: Option<PathBuf>, force: bool) -> Result<()> {
    // If the user points at a .toml file, use its parent directory;
    // a directory argument is used as the base directory itself.
    let base_dir = match config_arg {
        Some(path) if path.extension().map_or(false, |e| e == "toml") => path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_base_dir),
        Some(path) => path,
        None => Config::default_base_dir(),
    };

    cmd_init(InitOptions { base_dir, force }).await?;
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = match path {
        Some(p) if p.extension().map_or(false, |e| e == "toml") => p.to_path_buf(),
        Some(p) => p.join("config.toml"),
        None => Config::default_config_path(),
    };

    if !config_path.exists() {
        eprintln!(
            "Config file not found: {}\nRun 'scrivener init' first.",
            config_path.display()
        );
        std::process::exit(1);
    }

    Config::load(&config_path)
}
