//! DNS wire format and upstream forwarding.
//!
//! This module builds response messages for locally answered questions
//! and performs the single upstream exchange used when forwarding.

use std::net::SocketAddr;
use std::time::Duration;

use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use crate::errors::{DnsError, ForwardError};
use crate::store::ResourceRecord;
use crate::utils::encode_dns_name;

/// Deadline for a single upstream exchange. A slow or unreachable
/// upstream must not pin a query task indefinitely.
pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

/// Default upstream port when the configured forwarder has none.
pub const UPSTREAM_PORT: u16 = 53;

/// The transport a query arrived on. Forwarded exchanges use the same
/// transport as the original query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

/// Resolve the configured forwarder string to a socket address,
/// appending the default DNS port when none is given.
pub fn upstream_addr(forwarder: &str) -> Result<SocketAddr, ForwardError> {
    let with_port = if forwarder.contains(':') {
        forwarder.to_string()
    } else {
        format!("{forwarder}:{UPSTREAM_PORT}")
    };
    with_port
        .parse()
        .map_err(|_| ForwardError::BadAddress(forwarder.to_string()))
}

/// Perform one upstream exchange over the query's original transport.
///
/// Exactly one request/response round trip: no retry, no fallback
/// transport, no secondary upstream.
///
/// # Arguments
/// * `query` - The original, unmodified query message.
/// * `upstream` - The upstream resolver address.
/// * `transport` - The transport the query arrived on.
///
/// # Returns
/// A `Result` containing the upstream response or a `ForwardError`.
pub async fn exchange(
    query: &[u8],
    upstream: SocketAddr,
    transport: Transport,
) -> Result<Vec<u8>, ForwardError> {
    debug!("Forwarding query to resolver: {}", upstream);
    let response = match transport {
        Transport::Udp => forward_request_udp(upstream, query).await?,
        Transport::Tcp => forward_request_tcp(upstream, query).await?,
    };

    // Anything shorter than a DNS header is unusable
    if response.len() < 12 {
        return Err(ForwardError::Malformed);
    }
    Ok(response)
}

/// Forward a DNS query to an upstream resolver using UDP.
async fn forward_request_udp(upstream: SocketAddr, query: &[u8]) -> Result<Vec<u8>, ForwardError> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.send_to(query, upstream).await?;

    let mut buf = vec![0u8; 4096];
    let (size, _) = timeout(FORWARD_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .map_err(|_| ForwardError::Timeout)??;
    buf.truncate(size);
    Ok(buf)
}

/// Forward a DNS query to an upstream resolver using TCP.
async fn forward_request_tcp(upstream: SocketAddr, query: &[u8]) -> Result<Vec<u8>, ForwardError> {
    let fut = async {
        let mut stream = TcpStream::connect(upstream).await?;

        // Write the query with a 2-byte length prefix (per DNS over TCP)
        let query_len = query.len() as u16;
        stream.write_all(&query_len.to_be_bytes()).await?;
        stream.write_all(query).await?;

        // Read the 2-byte length prefix of the response
        let mut len_buf = [0u8; 2];
        stream.read_exact(&mut len_buf).await?;
        let resp_len = u16::from_be_bytes(len_buf) as usize;

        let mut resp_buf = vec![0u8; resp_len];
        stream.read_exact(&mut resp_buf).await?;
        Ok(resp_buf)
    };

    timeout(FORWARD_TIMEOUT, fut)
        .await
        .map_err(|_| ForwardError::Timeout)?
}

/// Send a DNS response over TCP with its length prefix.
pub async fn send_tcp_response(stream: &mut TcpStream, response: &[u8]) -> std::io::Result<()> {
    stream
        .write_all(&(response.len() as u16).to_be_bytes())
        .await?;
    stream.write_all(response).await
}

/// Build a response message for a query answered (or refused) locally.
///
/// The question section is copied verbatim from the query; answer
/// records carry fully encoded owner names, so answers for any question
/// in a multi-question message encode correctly.
///
/// # Arguments
/// * `query` - The DNS query packet.
/// * `question_end` - Byte offset just past the question section.
/// * `answers` - Records for the answer section, possibly empty.
/// * `rcode` - Response code (0 for no error, 3 for NXDOMAIN).
///
/// # Returns
/// A `Result` containing the response or an error.
pub fn build_response(
    query: &[u8],
    question_end: usize,
    answers: &[ResourceRecord],
    rcode: u8,
) -> Result<Vec<u8>, DnsError> {
    if query.len() < 12 || question_end > query.len() || question_end < 12 {
        return Err(DnsError::Protocol("Invalid question format".into()));
    }

    let mut response = Vec::with_capacity(512);

    // Transaction ID from the query
    response.extend_from_slice(&query[..2]);

    // Flags:
    // QR = 1 (response), OPCODE = 0, AA = 1 when answering from the
    // zone, TC = 0, RD copied from the query, RA = 1, RCODE as given.
    let mut flags1 = 0x80 | (query[2] & 0x01);
    if !answers.is_empty() {
        flags1 |= 0x04;
    }
    let flags2 = 0x80 | (rcode & 0x0f);
    response.extend_from_slice(&[flags1, flags2]);

    // QDCOUNT from the query, ANCOUNT from the answer set
    response.extend_from_slice(&query[4..6]);
    response.extend_from_slice(&(answers.len() as u16).to_be_bytes());

    // NSCOUNT and ARCOUNT
    response.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    // Question section, verbatim
    response.extend_from_slice(&query[12..question_end]);

    for record in answers {
        response.extend_from_slice(&encode_record(record));
    }

    Ok(response)
}

/// Encode a single resource record for the answer section.
fn encode_record(record: &ResourceRecord) -> Vec<u8> {
    let mut rr = Vec::with_capacity(64);

    match record {
        ResourceRecord::A {
            owner,
            ttl,
            address,
        } => {
            rr.extend_from_slice(&encode_dns_name(owner));
            rr.extend_from_slice(&[0x00, 0x01]); // TYPE A
            rr.extend_from_slice(&[0x00, 0x01]); // CLASS IN
            rr.extend_from_slice(&ttl.to_be_bytes());
            rr.extend_from_slice(&[0x00, 0x04]); // RDLENGTH
            rr.extend_from_slice(&address.octets());
        }
        ResourceRecord::Cname { owner, ttl, target } => {
            rr.extend_from_slice(&encode_dns_name(owner));
            rr.extend_from_slice(&[0x00, 0x05]); // TYPE CNAME
            rr.extend_from_slice(&[0x00, 0x01]); // CLASS IN
            rr.extend_from_slice(&ttl.to_be_bytes());
            let target_wire = encode_dns_name(target);
            rr.extend_from_slice(&(target_wire.len() as u16).to_be_bytes());
            rr.extend_from_slice(&target_wire);
        }
    }

    rr
}

/// Build a "not implemented" response for queries with a non-zero opcode.
///
/// # Arguments
/// * `query` - The DNS query packet.
/// * `question_end` - Byte offset just past the question section.
///
/// # Returns
/// A `Result` containing the response or an error.
pub fn build_not_implemented_response(
    query: &[u8],
    question_end: usize,
) -> Result<Vec<u8>, DnsError> {
    if query.len() < 12 || question_end > query.len() || question_end < 12 {
        return Err(DnsError::Protocol("Invalid question format".into()));
    }

    let mut response = Vec::with_capacity(question_end);
    response.extend_from_slice(&query[..2]);

    // QR = 1, OPCODE copied, RD copied, RA = 1, RCODE = 4 (NOTIMP)
    let opcode = query[2] & 0x78;
    let rd = query[2] & 0x01;
    response.extend_from_slice(&[0x80 | opcode | rd, 0x84]);

    response.extend_from_slice(&query[4..6]);
    response.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    response.extend_from_slice(&query[12..question_end]);

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{build_query, parse_questions};
    use std::net::Ipv4Addr;

    fn a_record(owner: &str, ttl: u32, address: &str) -> ResourceRecord {
        ResourceRecord::A {
            owner: owner.into(),
            ttl,
            address: address.parse::<Ipv4Addr>().unwrap(),
        }
    }

    #[test]
    fn authoritative_answer_layout() {
        let query = build_query(0xbeef, "example.com", 1);
        let (_, end) = parse_questions(&query).unwrap();
        let answers = [a_record("example.com.", 600, "192.0.2.1")];

        let resp = build_response(&query, end, &answers, 0).unwrap();

        assert_eq!(&resp[..2], &query[..2]); // ID preserved
        assert_eq!(resp[2] & 0x80, 0x80); // QR
        assert_eq!(resp[2] & 0x04, 0x04); // AA
        assert_eq!(resp[2] & 0x01, 0x01); // RD echoed
        assert_eq!(resp[3] & 0x0f, 0); // NOERROR
        assert_eq!(((resp[6] as u16) << 8) | resp[7] as u16, 1); // ANCOUNT

        // Answer record sits right after the copied question section
        let rr = &resp[end..];
        let name_len = encode_dns_name("example.com.").len();
        assert_eq!(&rr[name_len..name_len + 2], &[0x00, 0x01]); // TYPE A
        assert_eq!(&rr[name_len + 4..name_len + 8], &600u32.to_be_bytes());
        assert_eq!(&rr[name_len + 10..name_len + 14], &[192, 0, 2, 1]);
    }

    #[test]
    fn nxdomain_sets_rcode_and_clears_aa() {
        let query = build_query(1, "nosuch.example.com", 1);
        let (_, end) = parse_questions(&query).unwrap();
        let resp = build_response(&query, end, &[], 3).unwrap();

        assert_eq!(resp[3] & 0x0f, 3);
        assert_eq!(resp[2] & 0x04, 0);
        assert_eq!(((resp[6] as u16) << 8) | resp[7] as u16, 0); // ANCOUNT
        assert_eq!(resp.len(), end); // header + question only
    }

    #[test]
    fn cname_rdata_is_encoded_name() {
        let record = ResourceRecord::Cname {
            owner: "www.example.com.".into(),
            ttl: 300,
            target: "example.com.".into(),
        };
        let rr = encode_record(&record);
        let name_len = encode_dns_name("www.example.com.").len();
        assert_eq!(&rr[name_len..name_len + 2], &[0x00, 0x05]);
        let rdlen = ((rr[name_len + 8] as usize) << 8) | rr[name_len + 9] as usize;
        assert_eq!(&rr[name_len + 10..], &encode_dns_name("example.com.")[..]);
        assert_eq!(rdlen, encode_dns_name("example.com.").len());
    }

    #[test]
    fn not_implemented_echoes_opcode() {
        let mut query = build_query(9, "example.com", 1);
        query[2] |= 0x28; // opcode 5 (update)
        let (_, end) = parse_questions(&query).unwrap();
        let resp = build_not_implemented_response(&query, end).unwrap();
        assert_eq!(resp[2] & 0x78, 0x28);
        assert_eq!(resp[3] & 0x0f, 4);
    }

    #[test]
    fn upstream_addr_appends_default_port() {
        assert_eq!(
            upstream_addr("192.0.2.53").unwrap(),
            "192.0.2.53:53".parse().unwrap()
        );
        assert_eq!(
            upstream_addr("192.0.2.53:5353").unwrap(),
            "192.0.2.53:5353".parse().unwrap()
        );
        assert!(matches!(
            upstream_addr("not an address"),
            Err(ForwardError::BadAddress(_))
        ));
    }

    #[tokio::test]
    async fn udp_exchange_round_trip() {
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];
            let (n, src) = upstream.recv_from(&mut buf).await.unwrap();
            let mut reply = buf[..n].to_vec();
            reply[2] |= 0x80; // mark as response
            upstream.send_to(&reply, src).await.unwrap();
        });

        let query = build_query(0x4242, "forwarded.example.org", 1);
        let resp = exchange(&query, upstream_addr, Transport::Udp).await.unwrap();
        assert_eq!(&resp[..2], &query[..2]);
        assert_eq!(resp[2] & 0x80, 0x80);
    }

    #[tokio::test]
    async fn short_upstream_response_is_malformed() {
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];
            let (_, src) = upstream.recv_from(&mut buf).await.unwrap();
            upstream.send_to(&[0x00, 0x01], src).await.unwrap();
        });

        let query = build_query(1, "example.com", 1);
        let err = exchange(&query, upstream_addr, Transport::Udp)
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::Malformed));
    }
}
