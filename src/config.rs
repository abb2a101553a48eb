use std::{collections::HashMap, fs, path::Path};

use log::warn;

/// Engine configuration loaded from a `key=value` properties file.
/// Unrecognized keys are preserved and readable through `get`.
///
/// | key               | default   |
/// |-------------------|-----------|
/// | buffer.pool.size  | 1000      |
/// | max.connections   | 100       |
/// | log.level         | INFO      |
/// | data.directory    | ./data    |
/// | page.size         | 4096      |
/// | enable.wal        | true (reserved, not implemented) |
/// | wal.sync.interval | 1000 (reserved) |
/// | auto.create.indexes | true (reserved) |
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    properties: HashMap<String, String>,
}

pub const DEFAULT_CONFIG_FILE: &str = "emberdb.properties";

const DEFAULT_BUFFER_POOL_SIZE: usize = 1000;
const DEFAULT_MAX_CONNECTIONS: usize = 100;
const DEFAULT_LOG_LEVEL: &str = "INFO";
const DEFAULT_DATA_DIRECTORY: &str = "./data";
const DEFAULT_PAGE_SIZE: usize = 4096;

impl Default for DatabaseConfig {
    fn default() -> Self {
        let mut properties = HashMap::new();
        properties.insert("buffer.pool.size".to_string(), DEFAULT_BUFFER_POOL_SIZE.to_string());
        properties.insert("max.connections".to_string(), DEFAULT_MAX_CONNECTIONS.to_string());
        properties.insert("log.level".to_string(), DEFAULT_LOG_LEVEL.to_string());
        properties.insert("data.directory".to_string(), DEFAULT_DATA_DIRECTORY.to_string());
        properties.insert("page.size".to_string(), DEFAULT_PAGE_SIZE.to_string());
        properties.insert("enable.wal".to_string(), "true".to_string());
        properties.insert("wal.sync.interval".to_string(), "1000".to_string());
        properties.insert("auto.create.indexes".to_string(), "true".to_string());
        Self { properties }
    }
}

impl DatabaseConfig {
    pub fn new() -> Self {
        Self::load_or_default(DEFAULT_CONFIG_FILE)
    }

    /// Reads the properties file if it exists, falling back to defaults
    /// for anything absent (or for a missing file altogether).
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let mut config = Self::default();
        let Ok(content) = fs::read_to_string(path.as_ref()) else {
            return config;
        };

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }
            if let Some((key, value)) = trimmed.split_once('=') {
                config
                    .properties
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        config
    }

    pub fn buffer_pool_size(&self) -> usize {
        self.parse_number("buffer.pool.size", DEFAULT_BUFFER_POOL_SIZE)
    }

    pub fn max_connections(&self) -> usize {
        self.parse_number("max.connections", DEFAULT_MAX_CONNECTIONS)
    }

    pub fn log_level(&self) -> &str {
        self.properties
            .get("log.level")
            .map(String::as_str)
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn data_directory(&self) -> &str {
        self.properties
            .get("data.directory")
            .map(String::as_str)
            .unwrap_or(DEFAULT_DATA_DIRECTORY)
    }

    pub fn page_size(&self) -> usize {
        self.parse_number("page.size", DEFAULT_PAGE_SIZE)
    }

    pub fn wal_enabled(&self) -> bool {
        self.parse_flag("enable.wal", true)
    }

    pub fn wal_sync_interval(&self) -> usize {
        self.parse_number("wal.sync.interval", 1000)
    }

    pub fn auto_create_indexes(&self) -> bool {
        self.parse_flag("auto.create.indexes", true)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    fn parse_number(&self, key: &str, default: usize) -> usize {
        match self.properties.get(key).map(|v| v.parse::<usize>()) {
            Some(Ok(value)) => value,
            Some(Err(_)) => {
                warn!("Invalid numeric value for {}, using default {}", key, default);
                default
            }
            None => default,
        }
    }

    fn parse_flag(&self, key: &str, default: bool) -> bool {
        match self.properties.get(key).map(|v| v.parse::<bool>()) {
            Some(Ok(value)) => value,
            Some(Err(_)) => {
                warn!("Invalid boolean value for {}, using default {}", key, default);
                default
            }
            None => default,
        }
    }
}

impl std::fmt::Display for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "DatabaseConfig {{")?;
        writeln!(f, "  buffer_pool_size={}", self.buffer_pool_size())?;
        writeln!(f, "  max_connections={}", self.max_connections())?;
        writeln!(f, "  log_level={}", self.log_level())?;
        writeln!(f, "  data_directory={}", self.data_directory())?;
        writeln!(f, "  page_size={}", self.page_size())?;
        writeln!(f, "  wal_enabled={}", self.wal_enabled())?;
        writeln!(f, "  auto_create_indexes={}", self.auto_create_indexes())?;
        write!(f, "}}")
    }
}
