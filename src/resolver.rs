//! Query resolution.
//!
//! This module decides, per question, whether to answer from the record
//! store, forward upstream, or answer NXDOMAIN. The store is consulted
//! first; forwarding is only attempted for names with no local answer.

use log::{debug, warn};

use crate::config::ServerConfig;
use crate::dns::{build_response, exchange, upstream_addr, Transport};
use crate::errors::DnsError;
use crate::querylog::QueryLog;
use crate::store::{RecordStore, ResourceRecord};
use crate::utils::parse_questions;

/// How a single question was resolved.
#[derive(Debug)]
pub enum ResolutionOutcome<'a> {
    /// Answered from the local record store.
    Authoritative(&'a [ResourceRecord]),

    /// Relayed verbatim from the upstream resolver.
    Forwarded(Vec<u8>),

    /// No local answer and no forwarded answer: NXDOMAIN.
    Negative,
}

impl ResolutionOutcome<'_> {
    /// The outcome category written to the query log.
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionOutcome::Authoritative(_) => "Authoritative response",
            ResolutionOutcome::Forwarded(_) => "Forwarded response",
            ResolutionOutcome::Negative => "NXDOMAIN response",
        }
    }
}

/// The per-query decision engine.
///
/// Owns the immutable record store and configuration snapshot; shared
/// read-only across all query tasks.
#[derive(Debug)]
pub struct Resolver {
    store: RecordStore,
    config: ServerConfig,
    query_log: QueryLog,
}

impl Resolver {
    /// Create a resolver over a built store and a configuration snapshot.
    pub fn new(store: RecordStore, config: ServerConfig, query_log: QueryLog) -> Self {
        Self {
            store,
            config,
            query_log,
        }
    }

    /// Resolve an incoming query message into an outgoing response.
    ///
    /// Each question is resolved in order. Local answers accumulate in
    /// the answer section; the first question that has to be forwarded
    /// ends processing, and the upstream response is relayed verbatim as
    /// the entire reply (remaining questions are dropped). A question
    /// with neither a local nor a forwarded answer sets NXDOMAIN.
    ///
    /// # Arguments
    /// * `query` - The DNS query packet.
    /// * `transport` - The transport the query arrived on.
    ///
    /// # Returns
    /// A `Result` containing the response packet or an error.
    pub async fn resolve_message(
        &self,
        query: &[u8],
        transport: Transport,
    ) -> Result<Vec<u8>, DnsError> {
        let (questions, question_end) = parse_questions(query)
            .ok_or_else(|| DnsError::Protocol("Invalid question format".into()))?;

        let mut answers: Vec<ResourceRecord> = Vec::new();
        let mut rcode = 0u8;

        for question in &questions {
            debug!("Received query for: {}", question.name);

            let outcome = self.resolve(query, &question.name, transport).await;
            if self.config.query_logging {
                self.query_log.record(&question.name, outcome.label());
            }

            match outcome {
                ResolutionOutcome::Authoritative(records) => {
                    debug!("Responding with local records for {}", question.name);
                    answers.extend_from_slice(records);
                }
                ResolutionOutcome::Forwarded(response) => {
                    return Ok(response);
                }
                ResolutionOutcome::Negative => {
                    debug!("No local records found for {}", question.name);
                    rcode = 3; // NXDOMAIN
                }
            }
        }

        build_response(query, question_end, &answers, rcode)
    }

    /// Resolve one question.
    ///
    /// The name is normalized the same way owner names were normalized
    /// at load time, then looked up. On a miss, the original query
    /// message is forwarded when forwarding is enabled and an upstream
    /// is configured; a failed exchange degrades to a negative answer.
    pub async fn resolve(
        &self,
        raw_query: &[u8],
        query_name: &str,
        transport: Transport,
    ) -> ResolutionOutcome<'_> {
        if let Some(records) = self.store.lookup(query_name) {
            return ResolutionOutcome::Authoritative(records);
        }

        if self.config.forwarding_enabled() {
            match upstream_addr(&self.config.forwarder) {
                Ok(upstream) => match exchange(raw_query, upstream, transport).await {
                    Ok(response) => return ResolutionOutcome::Forwarded(response),
                    Err(e) => warn!("Error forwarding request: {}", e),
                },
                Err(e) => warn!("Error forwarding request: {}", e),
            }
        }

        ResolutionOutcome::Negative
    }
}
