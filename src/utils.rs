//! Utility functions for DNS packet handling.
//!
//! This module provides helper functions for parsing query packets and
//! encoding domain names in wire format.

use std::str;

/// A single question parsed from the question section of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// The queried name, exactly as spelled in the packet (no trailing dot).
    pub name: String,

    /// The requested record type (QTYPE).
    pub qtype: u16,

    /// The query class (QCLASS), normally IN (1).
    pub qclass: u16,
}

/// Parse the complete question section of a DNS query packet.
///
/// # Arguments
/// * `query` - The DNS query packet.
///
/// # Returns
/// An `Option` containing the parsed questions and the byte offset just
/// past the question section, or `None` if the packet is malformed.
pub fn parse_questions(query: &[u8]) -> Option<(Vec<Question>, usize)> {
    if query.len() < 12 {
        return None; // DNS header is 12 bytes
    }

    let qdcount = ((query[4] as u16) << 8) | query[5] as u16;
    let mut pos = 12;
    let mut questions = Vec::with_capacity(qdcount as usize);

    for _ in 0..qdcount {
        let mut name = String::new();

        // Read QNAME labels up to the root terminator
        loop {
            if pos >= query.len() {
                return None;
            }

            let len = query[pos] as usize;
            if len == 0 {
                pos += 1;
                break;
            }
            pos += 1;

            if pos + len > query.len() {
                return None; // Label runs past the packet
            }

            if !name.is_empty() {
                name.push('.');
            }
            let label = str::from_utf8(&query[pos..pos + len]).ok()?;
            name.push_str(label);
            pos += len;
        }

        // QTYPE and QCLASS follow the name
        if pos + 4 > query.len() {
            return None;
        }
        let qtype = ((query[pos] as u16) << 8) | query[pos + 1] as u16;
        let qclass = ((query[pos + 2] as u16) << 8) | query[pos + 3] as u16;
        pos += 4;

        questions.push(Question {
            name,
            qtype,
            qclass,
        });
    }

    Some((questions, pos))
}

/// Extract the first queried name from a DNS query packet.
///
/// Used for logging before the full question section has been parsed.
///
/// # Arguments
/// * `query` - The DNS query packet.
///
/// # Returns
/// An `Option` containing the domain name if successfully extracted.
pub fn extract_domain(query: &[u8]) -> Option<String> {
    let (questions, _) = parse_questions(query)?;
    questions.into_iter().next().map(|q| q.name)
}

/// Extract the first question's query type from a DNS query packet.
///
/// # Arguments
/// * `query` - The DNS query packet.
///
/// # Returns
/// An `Option` containing the query type as a u16 if successfully extracted.
pub fn extract_query_type(query: &[u8]) -> Option<u16> {
    let (questions, _) = parse_questions(query)?;
    questions.first().map(|q| q.qtype)
}

/// Encode a domain name in DNS wire format.
///
/// # Arguments
/// * `name` - The domain name to encode.
///
/// # Returns
/// A vector of bytes containing the encoded domain name.
pub fn encode_dns_name(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for part in name.trim_end_matches('.').split('.') {
        if part.is_empty() || part.len() > 63 {
            continue; // Skip invalid labels
        }
        out.push(part.len() as u8);
        out.extend_from_slice(part.as_bytes());
    }
    out.push(0); // Null terminator
    out
}

/// Build a query packet for a single question.
///
/// Only used by tests and diagnostic tooling; real queries arrive from
/// the network.
pub fn build_query(id: u16, name: &str, qtype: u16) -> Vec<u8> {
    let mut query = Vec::with_capacity(32);
    query.extend_from_slice(&id.to_be_bytes());
    query.extend_from_slice(&[0x01, 0x00]); // RD set
    query.extend_from_slice(&[0x00, 0x01]); // QDCOUNT = 1
    query.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    query.extend_from_slice(&encode_dns_name(name));
    query.extend_from_slice(&qtype.to_be_bytes());
    query.extend_from_slice(&[0x00, 0x01]); // CLASS IN
    query
}
