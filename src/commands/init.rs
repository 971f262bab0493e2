//! Init command implementation

use crate::config::{Config, PathsConfig};
use crate::error::{Error, Result};
use crate::meta::MetaDb;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: PathBuf,
    pub force: bool,
}

/// Initialize scrivener configuration and database
pub async fn cmd_init(options: InitOptions) -> Result<Config> {
    let InitOptions { base_dir, force } = options;

    let mut config = Config::default();
    config.paths = PathsConfig {
        config_file: base_dir.join("config.toml"),
        db_file: base_dir.join("scrivener.db"),
        base_dir: base_dir.clone(),
    };

    if config.paths.config_file.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config.paths.config_file.display()
        )));
    }

    config.validate()?;
    config.save()?;
    info!("Created config at {:?}", config.paths.config_file);

    let db = MetaDb::connect(&config.paths.db_file).await?;
    db.init_schema().await?;
    info!("Created database at {:?}", config.paths.db_file);

    println!("✓ Initialized scrivener at {:?}", config.paths.base_dir);
    println!("\nConfiguration: {:?}", config.paths.config_file);
    println!("Database: {:?}", config.paths.db_file);
    println!("\nNext steps:");
    println!("  scrivener ingest pdf ./report.pdf        # Import a local PDF");
    println!("  scrivener ingest url https://…/file.pdf  # Import a remote PDF");
    println!("  scrivener config show                    # Review pipeline settings");

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_config_and_database() {
        let tmp = TempDir::new().unwrap();
        let config = cmd_init(InitOptions {
            base_dir: tmp.path().to_path_buf(),
            force: false,
        })
        .await
        .unwrap();

        assert!(config.paths.config_file.exists());
        assert!(config.paths.db_file.exists());

        let db = MetaDb::connect(&config.paths.db_file).await.unwrap();
        assert!(db.is_initialized().await.unwrap());
    }

    #[tokio::test]
    async fn test_init_refuses_to_clobber_without_force() {
        let tmp = TempDir::new().unwrap();
        let options = InitOptions {
            base_dir: tmp.path().to_path_buf(),
            force: false,
        };
        cmd_init(options.clone()).await.unwrap();

        let err = cmd_init(options.clone()).await;
        assert!(err.is_err());

        let forced = cmd_init(InitOptions {
            force: true,
            ..options
        })
        .await;
        assert!(forced.is_ok());
    }
}
