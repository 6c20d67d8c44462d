/// Service configuration
///
/// Settings come from a TOML file (`carpark.toml` by default). Every field has
/// a default, so a missing file or a partial file is fine. Secrets such as
/// `DATABASE_URL` are never stored here; they are read from the environment,
/// which `dotenv` populates from a local `.env` file.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::logging::LogLevel;

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "./carpark.toml";

/// Public feed of current lot availability for every HDB car park.
pub const DEFAULT_AVAILABILITY_URL: &str =
    "https://api.data.gov.sg/v1/transport/carpark-availability";

// ---------------------------------------------------------------------------
// Configuration structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub catalog: CatalogConfig,
    pub query: QueryConfig,
    pub ingest: IngestConfig,
    pub logging: LoggingConfig,
}

/// Where the car park information export lives.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub data_dir: PathBuf,
    /// File name prefix of the export, e.g. "HDBCarparkInformation".
    pub file_prefix: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            file_prefix: "HDBCarparkInformation".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    /// Page size used when a request does not specify `per_page`.
    pub default_per_page: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { default_per_page: 10 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_AVAILABILITY_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of "debug", "info", "warn", "error".
    pub level: String,
    pub file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            console_timestamps: false,
        }
    }
}

impl LoggingConfig {
    /// Parsed minimum level, falling back to `Info` for unrecognised values.
    pub fn min_level(&self) -> LogLevel {
        self.level.parse().unwrap_or(LogLevel::Info)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, source: std::io::Error },
    Parse { path: String, source: toml::de::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "Failed to read {}: {}", path, source),
            ConfigError::Parse { path, source } => write!(f, "Invalid TOML in {}: {}", path, source),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parses configuration from TOML text.
pub fn parse_config(text: &str, origin: &str) -> Result<ServiceConfig, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: origin.to_string(),
        source,
    })
}

/// Loads configuration from `path`. A file that does not exist yields the
/// defaults; a file that exists but cannot be read or parsed is an error.
pub fn load_config(path: impl AsRef<Path>) -> Result<ServiceConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text, &display),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServiceConfig::default()),
        Err(source) => Err(ConfigError::Io { path: display, source }),
    }
}

/// Reads `DATABASE_URL`, loading `.env` first if present.
pub fn database_url() -> Option<String> {
    dotenv::dotenv().ok();
    std::env::var("DATABASE_URL").ok()
}
