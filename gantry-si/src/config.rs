//! Service configuration for gantry-si
//!
//! Resolution order follows the suite convention: environment variables
//! override the `[schedule_import]` section of the shared config file,
//! which overrides compiled defaults.

use gantry_common::config::{locate_config_file, resolve_data_folder};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming the data folder
const DATA_FOLDER_ENV: &str = "GANTRY_DATA";

/// Configuration for the schedule import service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP listen port
    pub port: u16,
    /// Shared SQLite database path
    pub database_path: PathBuf,
    /// Root folder of the uploaded-document store
    pub storage_root: PathBuf,
    /// External schedule parsing service endpoint
    pub parser_url: String,
    /// Hard timeout for one parse call, seconds
    pub parse_timeout_secs: u64,
    /// Rows per upsert statement
    pub upsert_batch_size: usize,
}

/// `[schedule_import]` section of the shared config file
#[derive(Debug, Default, Deserialize)]
struct FileSection {
    port: Option<u16>,
    storage_root: Option<String>,
    parser_url: Option<String>,
    parse_timeout_secs: Option<u64>,
    upsert_batch_size: Option<usize>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 5810,
            database_path: PathBuf::from("gantry.db"),
            storage_root: PathBuf::from("uploads"),
            parser_url: "http://127.0.0.1:5870/parse".to_string(),
            parse_timeout_secs: crate::services::parser_client::DEFAULT_PARSE_TIMEOUT.as_secs(),
            upsert_batch_size: 200,
        }
    }
}

impl ServiceConfig {
    /// Load configuration: env > config file > defaults
    pub fn load() -> gantry_common::Result<Self> {
        let mut config = Self::default();

        // Paths hang off the resolved data folder unless overridden below
        let data_folder = resolve_data_folder(None, DATA_FOLDER_ENV)?;
        config.database_path = data_folder.join("gantry.db");
        config.storage_root = data_folder.join("uploads");

        if let Ok(path) = locate_config_file() {
            if let Ok(content) = std::fs::read_to_string(&path) {
                match toml::from_str::<toml::Value>(&content) {
                    Ok(value) => {
                        if let Some(section) = value.get("schedule_import") {
                            let section: FileSection =
                                section.clone().try_into().unwrap_or_default();
                            config.apply_section(section);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Ignoring unparseable config file {}: {}", path.display(), e)
                    }
                }
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_section(&mut self, section: FileSection) {
        if let Some(port) = section.port {
            self.port = port;
        }
        if let Some(root) = section.storage_root {
            self.storage_root = PathBuf::from(root);
        }
        if let Some(url) = section.parser_url {
            self.parser_url = url;
        }
        if let Some(secs) = section.parse_timeout_secs {
            self.parse_timeout_secs = secs;
        }
        if let Some(size) = section.upsert_batch_size {
            self.upsert_batch_size = size;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("GANTRY_SI_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(url) = std::env::var("GANTRY_PARSER_URL") {
            self.parser_url = url;
        }
        if let Ok(root) = std::env::var("GANTRY_STORAGE_ROOT") {
            self.storage_root = PathBuf::from(root);
        }
    }
}
