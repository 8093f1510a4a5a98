//! Quartz DNS Server Library
//!
//! This library provides functionality for a small zone-backed DNS
//! server. It answers queries authoritatively from a zone file loaded
//! at startup (YAML or CSV), forwards unmatched queries to an upstream
//! resolver when enabled, and answers NXDOMAIN otherwise.

// Define modules
pub mod config;
pub mod dns;
pub mod errors;
pub mod handlers;
pub mod querylog;
pub mod resolver;
pub mod store;
pub mod utils;
pub mod zone;

// Re-export commonly used items
pub use config::ServerConfig;
pub use errors::{DnsError, ForwardError, ZoneLoadError};
pub use querylog::QueryLog;
pub use resolver::{ResolutionOutcome, Resolver};
pub use store::RecordStore;
pub use zone::ZoneFormat;
