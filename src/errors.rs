//! Error types for the DNS server.
//!
//! This module defines the error types used throughout the DNS server implementation.

use std::io;
use thiserror::Error;

use crate::zone::ZoneFormat;

/// Represents errors that can occur in the DNS server.
#[derive(Debug, Error)]
pub enum DnsError {
    /// I/O errors from the underlying system.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to DNS message format or content.
    #[error("Invalid DNS packet: {0}")]
    Protocol(String),

    /// Configuration errors from invalid settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Zone loading errors. Always fatal at startup.
    #[error("Zone error: {0}")]
    Zone(#[from] ZoneLoadError),
}

/// Errors that can occur while loading a zone file.
///
/// Every variant is fatal: the server must not start serving with an
/// undefined zone.
#[derive(Debug, Error)]
pub enum ZoneLoadError {
    /// The zone file does not exist.
    #[error("zone file not found: {0}")]
    NotFound(String),

    /// The zone file could not be read or decoded.
    #[error("malformed zone file {path}: {reason}")]
    Malformed { path: String, reason: String },

    /// The file extension does not match the declared zone file format.
    #[error("zone file {path} does not have a {format} extension")]
    FormatMismatch { path: String, format: ZoneFormat },
}

/// Errors from a single upstream forwarding exchange.
///
/// The resolver treats any of these as "no forwarded answer available"
/// and falls back to NXDOMAIN; they are never surfaced to the client.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connection or send/receive failure talking to the upstream.
    #[error("upstream exchange failed: {0}")]
    Io(#[from] io::Error),

    /// The upstream did not answer within the forwarding deadline.
    #[error("upstream exchange timed out")]
    Timeout,

    /// The upstream answered with something shorter than a DNS header.
    #[error("malformed upstream response")]
    Malformed,

    /// The configured upstream address could not be parsed.
    #[error("invalid upstream address: {0}")]
    BadAddress(String),
}
