//! Replication policies: the per-variant part of a router.
//!
//! The [`Router`](crate::Router) engine owns the buffer, acknowledgements
//! and transfer bookkeeping shared by every variant.  A policy only decides
//! what a message copy looks like at creation, which buffered messages may
//! be relayed to peers that are not their destination, and how copy budgets
//! split when a relay completes.

use std::fmt;
use std::str::FromStr;

use opp_core::HostId;

use crate::density::{DensityTracker, ThrottleSignal};
use crate::message::{Message, ProtocolMeta};
use crate::{RoutingError, RoutingResult};

// ── RouterKind ────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RouterKind {
    EpidemicWithAck,
    DirectDeliveryWithAck,
    SprayAndWait,
    DensityAware,
}

impl RouterKind {
    /// Settings name, also the namespace for variant-specific keys.
    pub fn as_str(self) -> &'static str {
        match self {
            RouterKind::EpidemicWithAck       => "EpidemicWithAckRouter",
            RouterKind::DirectDeliveryWithAck => "DirectDeliveryWithAckRouter",
            RouterKind::SprayAndWait          => "SprayAndWaitRouter",
            RouterKind::DensityAware          => "DensityAwareRouter",
        }
    }

    /// Whether messages carry a spray-and-wait copy budget.
    pub fn uses_copies(self) -> bool {
        matches!(self, RouterKind::SprayAndWait | RouterKind::DensityAware)
    }
}

impl fmt::Display for RouterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouterKind {
    type Err = RoutingError;

    fn from_str(s: &str) -> RoutingResult<Self> {
        match s.trim() {
            "EpidemicWithAckRouter" | "EpidemicWithAck" => Ok(RouterKind::EpidemicWithAck),
            "DirectDeliveryWithAckRouter" | "DirectDeliveryWithAck" => {
                Ok(RouterKind::DirectDeliveryWithAck)
            }
            "SprayAndWaitRouter" | "SprayAndWait" => Ok(RouterKind::SprayAndWait),
            "DensityAwareRouter" | "DensityAware" => Ok(RouterKind::DensityAware),
            other => Err(RoutingError::UnknownRouter(other.to_owned())),
        }
    }
}

// ── ReplicationPolicy ─────────────────────────────────────────────────────────

pub trait ReplicationPolicy: fmt::Debug {
    fn kind(&self) -> RouterKind;

    /// Metadata for a message created at this host.
    fn initial_meta(&self) -> ProtocolMeta {
        ProtocolMeta::None
    }

    /// A connection this host initiated came up (after the ack exchange).
    fn on_contact(&mut self, _now: f64) -> Option<ThrottleSignal> {
        None
    }

    /// Buffered messages that may be relayed to a peer other than their
    /// destination, in buffer order.
    fn on_tick<'a>(&self, host: HostId, buffered: &[&'a Message]) -> RoutingResult<Vec<&'a Message>>;

    /// Sender side of a completed relay (not a final delivery).
    fn on_transfer_done(&self, _host: HostId, _msg: &mut Message) -> RoutingResult<()> {
        Ok(())
    }

    /// Receiver side of a completed relay; `msg` is the copy as it left the
    /// sender.
    fn on_received(&self, _host: HostId, _msg: &mut Message) -> RoutingResult<()> {
        Ok(())
    }

    /// Throttle signals raised so far.
    fn throttle_signals(&self) -> &[ThrottleSignal] {
        &[]
    }
}

// ── Epidemic ──────────────────────────────────────────────────────────────────

/// Relay everything to everyone.
#[derive(Debug, Default)]
pub struct Epidemic;

impl ReplicationPolicy for Epidemic {
    fn kind(&self) -> RouterKind {
        RouterKind::EpidemicWithAck
    }

    fn on_tick<'a>(&self, _host: HostId, buffered: &[&'a Message]) -> RoutingResult<Vec<&'a Message>> {
        Ok(buffered.to_vec())
    }
}

// ── DirectDelivery ────────────────────────────────────────────────────────────

/// Hand messages only to their destination.
#[derive(Debug, Default)]
pub struct DirectDelivery;

impl ReplicationPolicy for DirectDelivery {
    fn kind(&self) -> RouterKind {
        RouterKind::DirectDeliveryWithAck
    }

    fn on_tick<'a>(&self, _host: HostId, _buffered: &[&'a Message]) -> RoutingResult<Vec<&'a Message>> {
        Ok(Vec::new())
    }
}

// ── SprayAndWait ──────────────────────────────────────────────────────────────

/// Copy-limited replication.
///
/// Standard mode hands out one copy per relay.  Binary mode gives the
/// receiver `ceil(n/2)` and keeps `floor(n/2)`.
#[derive(Debug, Clone)]
pub struct SprayAndWait {
    pub initial_copies: u32,
    pub binary:         bool,
}

impl SprayAndWait {
    pub fn new(initial_copies: u32, binary: bool) -> Self {
        Self { initial_copies, binary }
    }

    fn copies_of(host: HostId, msg: &Message) -> RoutingResult<u32> {
        msg.copies().ok_or(RoutingError::MissingMetadata { message: msg.id, host })
    }

    /// Copies the sender keeps after relaying from `n`.
    pub fn sender_share(&self, n: u32) -> u32 {
        if self.binary { n / 2 } else { n.saturating_sub(1) }
    }

    /// Copies the receiver gets from a sender holding `n`.
    pub fn receiver_share(&self, n: u32) -> u32 {
        if self.binary { n.div_ceil(2) } else { 1 }
    }
}

impl ReplicationPolicy for SprayAndWait {
    fn kind(&self) -> RouterKind {
        RouterKind::SprayAndWait
    }

    fn initial_meta(&self) -> ProtocolMeta {
        ProtocolMeta::SprayAndWait { copies: self.initial_copies }
    }

    fn on_tick<'a>(&self, host: HostId, buffered: &[&'a Message]) -> RoutingResult<Vec<&'a Message>> {
        let mut out = Vec::new();
        for &m in buffered {
            if Self::copies_of(host, m)? > 1 {
                out.push(m);
            }
        }
        Ok(out)
    }

    fn on_transfer_done(&self, host: HostId, msg: &mut Message) -> RoutingResult<()> {
        let n = Self::copies_of(host, msg)?;
        msg.set_copies(self.sender_share(n));
        Ok(())
    }

    fn on_received(&self, host: HostId, msg: &mut Message) -> RoutingResult<()> {
        let n = Self::copies_of(host, msg)?;
        msg.set_copies(self.receiver_share(n));
        Ok(())
    }
}

// ── DensityAware ──────────────────────────────────────────────────────────────

/// Spray-and-wait plus a contact-density counter on initiated contacts.
#[derive(Debug, Clone)]
pub struct DensityAware {
    pub spray:   SprayAndWait,
    pub tracker: DensityTracker,
}

impl DensityAware {
    pub fn new(spray: SprayAndWait, density_limit: f64, time_limit: f64) -> Self {
        Self { spray, tracker: DensityTracker::new(density_limit, time_limit) }
    }
}

impl ReplicationPolicy for DensityAware {
    fn kind(&self) -> RouterKind {
        RouterKind::DensityAware
    }

    fn initial_meta(&self) -> ProtocolMeta {
        self.spray.initial_meta()
    }

    fn on_contact(&mut self, now: f64) -> Option<ThrottleSignal> {
        self.tracker.record_contact(now)
    }

    fn on_tick<'a>(&self, host: HostId, buffered: &[&'a Message]) -> RoutingResult<Vec<&'a Message>> {
        self.spray.on_tick(host, buffered)
    }

    fn on_transfer_done(&self, host: HostId, msg: &mut Message) -> RoutingResult<()> {
        self.spray.on_transfer_done(host, msg)
    }

    fn on_received(&self, host: HostId, msg: &mut Message) -> RoutingResult<()> {
        self.spray.on_received(host, msg)
    }

    fn throttle_signals(&self) -> &[ThrottleSignal] {
        self.tracker.signals()
    }
}
