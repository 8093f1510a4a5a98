//! In-memory record store.
//!
//! This module turns raw zone entries into typed resource records keyed
//! by their canonical owner name. The store is built once at startup and
//! is never mutated afterwards, so it can be shared across query tasks
//! without locking.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use log::{debug, warn};

use crate::zone::RawRecordEntry;

/// A validated resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRecord {
    /// An IPv4 address record.
    A {
        owner: String,
        ttl: u32,
        address: Ipv4Addr,
    },

    /// An alias record. The target is stored verbatim; it is not checked
    /// against the rest of the zone, so dangling targets are legal.
    Cname {
        owner: String,
        ttl: u32,
        target: String,
    },
}

impl ResourceRecord {
    /// The fully-qualified, case-folded owner name of this record.
    pub fn owner(&self) -> &str {
        match self {
            ResourceRecord::A { owner, .. } => owner,
            ResourceRecord::Cname { owner, .. } => owner,
        }
    }

    /// The record's time-to-live in seconds.
    pub fn ttl(&self) -> u32 {
        match self {
            ResourceRecord::A { ttl, .. } => *ttl,
            ResourceRecord::Cname { ttl, .. } => *ttl,
        }
    }
}

/// Normalize an owner or query name for storage and lookup.
///
/// Appends the trailing dot if absent and folds to lowercase. Idempotent.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = name.to_ascii_lowercase();
    if !normalized.ends_with('.') {
        normalized.push('.');
    }
    normalized
}

/// Validate a raw entry into a typed record.
///
/// Entries with an unsupported type tag, or an `A` entry whose data is
/// not an IPv4 literal, are dropped with a diagnostic and do not fail
/// the load.
pub fn materialize(entry: &RawRecordEntry) -> Option<ResourceRecord> {
    let owner = normalize_name(&entry.name);

    match entry.rtype.as_str() {
        "A" => match entry.data.parse::<Ipv4Addr>() {
            Ok(address) => Some(ResourceRecord::A {
                owner,
                ttl: entry.ttl,
                address,
            }),
            Err(_) => {
                warn!(
                    "Invalid IPv4 address {:?} for A record {}, entry dropped",
                    entry.data, entry.name
                );
                None
            }
        },
        "CNAME" => Some(ResourceRecord::Cname {
            owner,
            ttl: entry.ttl,
            target: entry.data.clone(),
        }),
        other => {
            warn!("Unsupported record type: {}", other);
            None
        }
    }
}

/// The zone's record table, keyed by canonical owner name.
///
/// An owner key only exists alongside at least one record, so a present
/// key always carries a non-empty sequence. Absence of a key means "no
/// local answer".
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<String, Vec<ResourceRecord>>,
}

impl RecordStore {
    /// Build the store from the full set of raw entries.
    ///
    /// Duplicates are preserved; insertion order within an owner is the
    /// source order.
    pub fn build(entries: &[RawRecordEntry]) -> Self {
        let mut records: HashMap<String, Vec<ResourceRecord>> = HashMap::new();

        for entry in entries {
            if let Some(record) = materialize(entry) {
                debug!(
                    "Loaded record: {} {} {} {}",
                    entry.name, entry.rtype, entry.ttl, entry.data
                );
                records
                    .entry(record.owner().to_string())
                    .or_default()
                    .push(record);
            }
        }

        Self { records }
    }

    /// Look up all records under a (not necessarily normalized) name.
    ///
    /// The requested record type plays no part in the lookup; every
    /// record under the owner is returned.
    pub fn lookup(&self, name: &str) -> Option<&[ResourceRecord]> {
        self.records
            .get(&normalize_name(name))
            .map(|records| records.as_slice())
    }

    /// Number of distinct owner names in the store.
    pub fn owner_count(&self) -> usize {
        self.records.len()
    }

    /// Total number of records in the store.
    pub fn record_count(&self) -> usize {
        self.records.values().map(|r| r.len()).sum()
    }
}
