//! Request handlers for the DNS server.
//!
//! This module provides the UDP and TCP listeners. Each received
//! datagram or accepted connection is handled on its own spawned task;
//! the resolver is shared read-only between all of them.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::{
    io::AsyncReadExt,
    net::{TcpListener, TcpStream, UdpSocket},
    task,
};

use crate::config::{ServerConfig, MAX_PACKET_SIZE};
use crate::dns::{build_not_implemented_response, send_tcp_response, Transport};
use crate::errors::DnsError;
use crate::resolver::Resolver;
use crate::utils::parse_questions;

/// Run the UDP DNS server.
///
/// # Arguments
/// * `config` - The server configuration.
/// * `resolver` - The shared resolver.
///
/// # Returns
/// A `Result` indicating success or failure.
pub async fn run_udp_server(config: ServerConfig, resolver: Arc<Resolver>) -> Result<(), DnsError> {
    let socket = UdpSocket::bind(config.bind_addr()).await?;
    info!("UDP DNS server listening on {}", config.bind_addr());
    let socket = Arc::new(socket);
    let mut buf = vec![0u8; MAX_PACKET_SIZE];

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((amt, src)) => {
                let query = buf[..amt].to_vec();
                let socket = socket.clone();
                let resolver = resolver.clone();
                task::spawn(async move {
                    if let Err(e) = handle_udp_query(query, src, socket, resolver).await {
                        warn!("UDP query error: {}", e);
                    }
                });
            }
            Err(e) => error!("UDP receive error: {}", e),
        }
    }
}

/// Handle a single UDP DNS query.
async fn handle_udp_query(
    query: Vec<u8>,
    src: SocketAddr,
    socket: Arc<UdpSocket>,
    resolver: Arc<Resolver>,
) -> Result<(), DnsError> {
    debug!("UDP query from {}", src);
    match dispatch(&query, Transport::Udp, &resolver).await {
        Some(response) => {
            socket.send_to(&response, src).await?;
            Ok(())
        }
        None => {
            debug!("Dropping malformed query from {}", src);
            Ok(())
        }
    }
}

/// Run the TCP DNS server.
///
/// # Arguments
/// * `config` - The server configuration.
/// * `resolver` - The shared resolver.
///
/// # Returns
/// A `Result` indicating success or failure.
pub async fn run_tcp_server(config: ServerConfig, resolver: Arc<Resolver>) -> Result<(), DnsError> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("TCP DNS server listening on {}", config.bind_addr());

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let resolver = resolver.clone();
                task::spawn(async move {
                    if let Err(e) = handle_tcp_connection(stream, addr, resolver).await {
                        warn!("TCP connection error: {}", e);
                    }
                });
            }
            Err(e) => error!("TCP accept error: {}", e),
        }
    }
}

/// Handle one DNS request on a TCP connection.
async fn handle_tcp_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    resolver: Arc<Resolver>,
) -> Result<(), DnsError> {
    // Read the 2-byte length prefix, then the query itself
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;
    let len = u16::from_be_bytes(len_buf) as usize;

    let mut query = vec![0u8; len];
    stream.read_exact(&mut query).await?;

    debug!("TCP query from {}", addr);
    match dispatch(&query, Transport::Tcp, &resolver).await {
        Some(response) => send_tcp_response(&mut stream, &response).await?,
        None => debug!("Dropping malformed TCP query from {}", addr),
    }
    Ok(())
}

/// Route a query to the resolver, handling the non-query opcodes the
/// resolver does not implement. Returns `None` for packets too broken
/// to answer at all.
async fn dispatch(query: &[u8], transport: Transport, resolver: &Resolver) -> Option<Vec<u8>> {
    if query.len() < 12 {
        return None;
    }

    let opcode = (query[2] & 0x78) >> 3;
    if opcode != 0 {
        let (_, question_end) = parse_questions(query)?;
        return build_not_implemented_response(query, question_end).ok();
    }

    match resolver.resolve_message(query, transport).await {
        Ok(response) => Some(response),
        Err(e) => {
            debug!("Failed to resolve query: {}", e);
            None
        }
    }
}
