//! Configuration for the DNS server.
//!
//! This module decodes the settings file into an immutable configuration
//! snapshot. The resolver only consumes the decoded values; it never
//! re-reads or mutates them.

use std::net::SocketAddr;

use config::{Config, File, FileFormat};
use serde::Deserialize;

use crate::errors::DnsError;
use crate::zone::ZoneFormat;

/// Default settings file, next to the server binary.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.conf";

/// Maximum size of DNS packets in bytes.
pub const MAX_PACKET_SIZE: usize = 4096;

fn default_port() -> u16 {
    53
}

fn default_enable_forwarding() -> bool {
    true
}

/// Server configuration loaded from the settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Path to the zone file.
    pub zone_file: String,

    /// Declared zone file format tag (`yaml` or `csv`).
    pub zone_file_format: String,

    /// UDP/TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upstream resolver address; empty disables forwarding.
    #[serde(default)]
    pub forwarder: String,

    /// Whether unmatched queries may be forwarded upstream.
    #[serde(default = "default_enable_forwarding")]
    pub enable_forwarding: bool,

    /// Whether per-question events are appended to the query log.
    #[serde(default)]
    pub query_logging: bool,

    /// Path to the query log file.
    #[serde(default)]
    pub query_log_file: String,
}

impl ServerConfig {
    /// Load server configuration from an INI settings file.
    ///
    /// # Arguments
    /// * `path` - Path to the settings file.
    ///
    /// # Returns
    /// A `Result` containing either the loaded `ServerConfig` or a `DnsError`.
    pub fn load(path: &str) -> Result<Self, DnsError> {
        Config::builder()
            .add_source(File::new(path, FileFormat::Ini))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DnsError::Config(format!("failed to load settings from {path}: {e}")))
    }

    /// The declared zone format, validated.
    pub fn zone_format(&self) -> Result<ZoneFormat, DnsError> {
        self.zone_file_format
            .parse()
            .map_err(DnsError::Config)
    }

    /// Address to bind the listeners to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Forwarding happens only when it is enabled and an upstream
    /// address is actually configured.
    pub fn forwarding_enabled(&self) -> bool {
        self.enable_forwarding && !self.forwarder.is_empty()
    }
}
