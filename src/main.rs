//! Quartz DNS Server
//!
//! A small DNS server that answers authoritatively from a zone file and
//! can forward unmatched queries to an upstream resolver.

use std::env;
use std::sync::Arc;

use log::info;
use tokio::signal;

use quartz_dns::{
    config::{ServerConfig, DEFAULT_SETTINGS_FILE},
    errors::DnsError,
    handlers::{run_tcp_server, run_udp_server},
    querylog::QueryLog,
    resolver::Resolver,
    store::RecordStore,
    zone,
};

#[tokio::main]
async fn main() -> Result<(), DnsError> {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    // Load configuration from the settings file
    let settings_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SETTINGS_FILE.to_string());
    let config = ServerConfig::load(&settings_path)?;

    info!("Configuration loaded:");
    info!("  Zone file: {}", config.zone_file);
    info!("  Port: {}", config.port);
    info!("  Forwarder: {}", config.forwarder);
    info!("  Query logging: {}", config.query_logging);
    info!("  Query log file: {}", config.query_log_file);
    info!("  Enable forwarding: {}", config.enable_forwarding);

    // Load the zone and build the record store before accepting queries
    let format = config.zone_format()?;
    let entries = zone::load(&config.zone_file, format)?;
    let store = RecordStore::build(&entries);
    info!(
        "Record store ready: {} records under {} names",
        store.record_count(),
        store.owner_count()
    );

    // Open the query log file if logging is enabled
    let query_log = if config.query_logging {
        QueryLog::open(&config.query_log_file)?
    } else {
        QueryLog::disabled()
    };

    let resolver = Arc::new(Resolver::new(store, config.clone(), query_log));

    // Set up shutdown signal handler
    let shutdown_signal = async {
        signal::ctrl_c()
            .await
            .expect("Failed to listen for shutdown signal");
        info!("Shutdown signal received");
    };

    // Start UDP and TCP servers
    let udp_server = run_udp_server(config.clone(), resolver.clone());
    let tcp_server = run_tcp_server(config, resolver);

    // Wait for either a shutdown signal or server error
    tokio::select! {
        _ = shutdown_signal => {
            info!("Initiating graceful shutdown...");
            Ok(())
        },
        res = udp_server => res,
        res = tcp_server => res,
    }
}
