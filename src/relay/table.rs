//! Pending-request table.
//!
//! Maps the 11-byte correlation key of every in-flight BOOTREQUEST to the
//! record needed to route its reply. Entries live until a matching reply is
//! sent or their 10-second deadline passes; the 1 Hz tick evicts the rest.

use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use macaddr::MacAddr6;

use crate::codec::decode::DecodedFrame;
use crate::codec::frame::MessageType;
use crate::codec::CorrelationKey;

/// How long a request may wait for a backend reply.
pub const REQUEST_TTL: Duration = Duration::from_secs(10);

/// FNV-1a over the raw key bytes. The key is opaque and uniformly mixed
/// already (MAC + xid), so a trivial byte-mixing hash is enough.
#[derive(Default)]
pub struct KeyHasher(u64);

impl Hasher for KeyHasher {
    fn write(&mut self, bytes: &[u8]) {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
        if self.0 == 0 {
            self.0 = FNV_OFFSET;
        }
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

/// One in-flight request, owned exclusively by the table.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub key: CorrelationKey,
    /// Source address of the original UDP datagram; the reply keeps its
    /// port even when redirected to a relay or the broadcast address.
    pub remote: SocketAddr,
    pub deadline: Instant,
    pub message_type: Option<MessageType>,
    pub chaddr: MacAddr6,
    pub xid: u32,
}

impl PendingRequest {
    pub fn new(decoded: &DecodedFrame, remote: SocketAddr, now: Instant) -> Self {
        Self {
            key: decoded.key,
            remote,
            deadline: now + REQUEST_TTL,
            message_type: decoded.message_type,
            chaddr: decoded.chaddr,
            xid: decoded.xid,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.message_type.map(MessageType::name).unwrap_or("bootp")
    }
}

/// The table proper. Capacity is unbounded in principle, bounded in practice
/// by the backend service rate and the 10-second deadline.
#[derive(Default)]
pub struct RequestTable {
    entries: HashMap<CorrelationKey, PendingRequest, BuildHasherDefault<KeyHasher>>,
}

impl RequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending request under its own key, replacing any stale entry
    /// for the same exchange.
    pub fn insert(&mut self, request: PendingRequest) {
        self.entries.insert(request.key, request);
    }

    pub fn lookup(&self, key: &CorrelationKey) -> Option<&PendingRequest> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &CorrelationKey) -> Option<PendingRequest> {
        self.entries.remove(key)
    }

    /// Evict every entry whose deadline has passed, returning the evicted
    /// records so the caller can log them.
    pub fn expire(&mut self, now: Instant) -> Vec<PendingRequest> {
        let expired: Vec<CorrelationKey> = self
            .entries
            .values()
            .filter(|request| request.deadline <= now)
            .map(|request| request.key)
            .collect();
        expired
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
