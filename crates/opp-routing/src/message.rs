//! Messages and their per-protocol metadata.

use opp_core::{HostId, MessageId};

/// Protocol-specific state carried by a message copy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ProtocolMeta {
    #[default]
    None,
    /// Copies this holder may still hand out (spray-and-wait family).
    SprayAndWait { copies: u32 },
}

/// One copy of a message.  Identity fields never change; `meta` and
/// `hop_count` belong to the copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id:        MessageId,
    pub from:      HostId,
    pub to:        HostId,
    /// Bytes.
    pub size:      u64,
    /// Creation time, seconds.
    pub created:   f64,
    /// Time to live in minutes; `None` never expires.
    pub ttl:       Option<f64>,
    pub hop_count: u32,
    pub meta:      ProtocolMeta,
}

impl Message {
    pub fn new(id: MessageId, from: HostId, to: HostId, size: u64, created: f64) -> Self {
        Self { id, from, to, size, created, ttl: None, hop_count: 0, meta: ProtocolMeta::None }
    }

    /// Minutes left to live at `now`.
    pub fn remaining_ttl(&self, now: f64) -> f64 {
        match self.ttl {
            Some(ttl) => ttl - (now - self.created) / 60.0,
            None => f64::INFINITY,
        }
    }

    #[inline]
    pub fn is_expired(&self, now: f64) -> bool {
        self.remaining_ttl(now) <= 0.0
    }

    /// Spray-and-wait copy budget, if this copy carries one.
    pub fn copies(&self) -> Option<u32> {
        match self.meta {
            ProtocolMeta::SprayAndWait { copies } => Some(copies),
            ProtocolMeta::None => None,
        }
    }

    pub fn set_copies(&mut self, copies: u32) {
        self.meta = ProtocolMeta::SprayAndWait { copies };
    }
}
