//! Operator configuration.
//!
//! A flat `key=value` text file (`config.properties`) with four recognized
//! keys. A missing file or malformed value degrades to the documented
//! default with an error log line; configuration problems are never fatal.

use crate::results::SortOrder;
use std::path::Path;
use tracing::{error, info};

pub const DEFAULT_CONFIG_FILE: &str = "config.properties";
const DEFAULT_SERVER: &str = "example.com";
const DEFAULT_PORT: u16 = 3000;

/// Collector endpoint and export cadence settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Collector host name.
    pub server: String,
    /// Collector TCP port.
    pub port: u16,
    /// Export early standings at race start instead of final results.
    pub create_json_at_race_start: bool,
    /// Write artifacts but never contact the collector.
    pub disable_upload: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            create_json_at_race_start: false,
            disable_upload: false,
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults per key.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let mut config = Config::default();

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                error!(
                    "Failed to open {}: {}; using defaults {}:{}, createJsonAtRaceStart: no, disableUpload: no",
                    path.as_ref().display(),
                    e,
                    DEFAULT_SERVER,
                    DEFAULT_PORT,
                );
                return config;
            }
        };

        for line in contents.lines() {
            let Some((key, value)) = line.split_once('=') else { continue };
            match key {
                "server" => config.server = value.to_string(),
                "port" => match value.parse::<u16>() {
                    Ok(port) => config.port = port,
                    Err(_) => {
                        error!("Invalid port '{}', keeping default {}", value, config.port);
                    }
                },
                "createJsonAtRaceStart" => config.create_json_at_race_start = value == "yes",
                "disableUpload" => config.disable_upload = value == "yes",
                _ => {}
            }
        }

        info!(
            "Server config loaded: {}:{}, createJsonAtRaceStart: {}, disableUpload: {}",
            config.server,
            config.port,
            if config.create_json_at_race_start { "yes" } else { "no" },
            if config.disable_upload { "yes" } else { "no" },
        );
        config
    }

    /// Collector endpoint URL.
    pub fn upload_url(&self) -> String {
        format!("http://{}:{}/upload", self.server, self.port)
    }

    /// Sort policy implied by the export cadence settings.
    pub fn sort_order(&self) -> SortOrder {
        if self.create_json_at_race_start && self.disable_upload {
            SortOrder::ByCarName
        } else {
            SortOrder::ByPosition
        }
    }
}
