use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{ensure, Context};
use tr_core::core::CriteriaCatalog;
use tr_store::{ReviewStore, SqliteReviewStore};

use crate::config::AppConfig;

const LOG_FORMATS: [&str; 2] = ["json", "pretty"];

// ---------------------------------------------------------------------------
// StorageTarget: where the review database lives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    File(PathBuf),
    InMemory,
}

impl StorageTarget {
    /// Opens the database and applies the schema.
    pub fn open(&self) -> Result<Arc<dyn ReviewStore>, anyhow::Error> {
        let store = match self {
            Self::File(path) => SqliteReviewStore::new(path)
                .with_context(|| format!("failed to open database at {}", path.display()))?,
            Self::InMemory => SqliteReviewStore::new_in_memory()?,
        };
        store.init().context("failed to initialize schema")?;
        Ok(Arc::new(store))
    }
}

// ---------------------------------------------------------------------------
// RuntimeConfig: fully validated runtime configuration
// ---------------------------------------------------------------------------

pub struct RuntimeConfig {
    pub listen_addr: SocketAddr,
    pub storage: StorageTarget,
    pub catalog: CriteriaCatalog,
    pub log_level: String,
    pub log_format: String,
}

// ---------------------------------------------------------------------------
// into_runtime: converts raw AppConfig into validated RuntimeConfig
// ---------------------------------------------------------------------------

pub fn into_runtime(config: AppConfig) -> Result<RuntimeConfig, anyhow::Error> {
    let listen_addr: SocketAddr = config
        .server
        .listen
        .parse()
        .with_context(|| format!("invalid listen address: {}", config.server.listen))?;

    let storage = if config.storage.in_memory {
        StorageTarget::InMemory
    } else {
        ensure!(
            !config.storage.path.trim().is_empty(),
            "storage path required unless in_memory is set"
        );
        StorageTarget::File(PathBuf::from(config.storage.path))
    };

    ensure!(
        LOG_FORMATS.contains(&config.logging.format.as_str()),
        "unknown log format: {} (expected json or pretty)",
        config.logging.format
    );

    let catalog = match config.catalog.path {
        Some(path) => load_catalog(&path)?,
        None => CriteriaCatalog::default_rubric(),
    };
    catalog.validate()?;
    ensure!(
        !catalog.conversation.is_empty(),
        "catalog has no conversation criteria"
    );

    Ok(RuntimeConfig {
        listen_addr,
        storage,
        catalog,
        log_level: config.logging.level,
        log_format: config.logging.format,
    })
}

fn load_catalog(path: &str) -> Result<CriteriaCatalog, anyhow::Error> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read catalog {path}"))?;
    let catalog = toml::from_str(&content).with_context(|| format!("invalid catalog {path}"))?;
    Ok(catalog)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogConfig, LoggingConfig, ServerConfig, StorageConfig};

    fn make_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                listen: "127.0.0.1:8080".to_owned(),
            },
            storage: StorageConfig {
                path: String::new(),
                in_memory: true,
            },
            catalog: CatalogConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_conversion() {
        let runtime = into_runtime(make_config()).expect("valid config should convert");

        assert_eq!(runtime.listen_addr.port(), 8080);
        assert_eq!(runtime.storage, StorageTarget::InMemory);
        assert_eq!(runtime.catalog, CriteriaCatalog::default_rubric());
        assert_eq!(runtime.log_level, "info");
        assert_eq!(runtime.log_format, "json");
    }

    #[test]
    fn test_file_storage() {
        let mut config = make_config();
        config.storage = StorageConfig {
            path: "reviews.db".to_owned(),
            in_memory: false,
        };

        let runtime = into_runtime(config).expect("file storage should convert");
        assert_eq!(runtime.storage, StorageTarget::File(PathBuf::from("reviews.db")));
    }

    #[test]
    fn test_invalid_listen_rejected() {
        let mut config = make_config();
        config.server.listen = "not-an-address".to_owned();

        match into_runtime(config) {
            Err(e) => assert!(e.to_string().contains("invalid listen address")),
            Ok(_) => panic!("expected error for invalid listen address"),
        }
    }

    #[test]
    fn test_empty_storage_path_rejected() {
        let mut config = make_config();
        config.storage.in_memory = false;

        match into_runtime(config) {
            Err(e) => assert!(e.to_string().contains("storage path required")),
            Ok(_) => panic!("expected error for empty storage path"),
        }
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let mut config = make_config();
        config.logging.format = "xml".to_owned();

        match into_runtime(config) {
            Err(e) => assert!(e.to_string().contains("unknown log format")),
            Ok(_) => panic!("expected error for unknown log format"),
        }
    }

    #[test]
    fn test_missing_catalog_file_rejected() {
        let mut config = make_config();
        config.catalog.path = Some("/nonexistent/rubric.toml".to_owned());

        match into_runtime(config) {
            Err(e) => assert!(e.to_string().contains("failed to read catalog")),
            Ok(_) => panic!("expected error for missing catalog"),
        }
    }

    #[test]
    fn test_open_in_memory() {
        let store = StorageTarget::InMemory.open().expect("open in-memory store");
        assert!(store.list_projects().expect("list").is_empty());
    }
}
