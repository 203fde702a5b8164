//! Per-host routing engine shared by every variant.
//!
//! A [`Router`] owns the host's message buffer, acknowledgement set, sent
//! ledger and transfer bookkeeping.  Everything that needs two routers at
//! once (contact exchange, starting a transfer, completing one) goes through
//! [`RouterSet`](crate::RouterSet).

use std::collections::BTreeMap;

use tracing::{debug, trace};

use opp_core::{ConnectionId, HostId, MessageId, SimRng};
use opp_net::Transfer;

use crate::ack::{AckSet, IdSet, SentLedger};
use crate::buffer::MessageBuffer;
use crate::density::ThrottleSignal;
use crate::message::Message;
use crate::policy::{ReplicationPolicy, RouterKind};
use crate::settings::{QueueMode, RouterSettings};
use crate::window::TransferWindow;
use crate::{RoutingError, RoutingResult};

/// Receiver's answer to an offered message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReceiveStatus {
    Ok,
    /// Receiver is busy with another transfer.
    TryLaterBusy,
    /// Already buffered, already delivered here, or acknowledged.
    DeniedOld,
    /// Expired and not addressed to the receiver.
    DeniedTtl,
    /// Not enough evictable buffer space.
    DeniedNoSpace,
    /// Receiver is out of energy.
    DeniedLowResources,
}

impl ReceiveStatus {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == ReceiveStatus::Ok
    }
}

/// Delivery counters for reporters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Messages created here.
    pub created:        u64,
    /// Transfers this host started sending.
    pub started:        u64,
    /// Copies received for onward relay.
    pub relayed:        u64,
    /// Messages delivered here as final recipient (first copy only).
    pub delivered:      u64,
    /// Outgoing transfers cut off by a disconnect.
    pub aborted:        u64,
    /// Messages dropped for TTL or buffer space.
    pub dropped:        u64,
    /// Messages purged because their id was acknowledged.
    pub removed_by_ack: u64,
}

pub struct Router {
    host:       HostId,
    policy:     Box<dyn ReplicationPolicy>,
    buffer:     MessageBuffer,
    acks:       AckSet,
    sent:       SentLedger,
    delivered:  IdSet,
    /// Copies being received, as they left their sender.
    incoming:   BTreeMap<MessageId, Message>,
    /// Transfers this host is sending, by connection.
    outgoing:   BTreeMap<ConnectionId, MessageId>,
    msg_ttl:    Option<f64>,
    queue_mode: QueueMode,
    rng:        SimRng,
    window:     TransferWindow,
    stats:      RouterStats,
}

impl Router {
    /// `rng` is only drawn from in random queue mode.
    pub fn new(host: HostId, settings: &RouterSettings, rng: SimRng) -> Self {
        Self {
            host,
            policy: settings.build_policy(),
            buffer: MessageBuffer::new(settings.buffer_size),
            acks: AckSet::new(),
            sent: SentLedger::new(),
            delivered: IdSet::default(),
            incoming: BTreeMap::new(),
            outgoing: BTreeMap::new(),
            msg_ttl: settings.msg_ttl,
            queue_mode: settings.queue_mode,
            rng,
            window: TransferWindow::new(),
            stats: RouterStats::default(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn host(&self) -> HostId {
        self.host
    }

    #[inline]
    pub fn kind(&self) -> RouterKind {
        self.policy.kind()
    }

    #[inline]
    pub fn buffer(&self) -> &MessageBuffer {
        &self.buffer
    }

    #[inline]
    pub fn acks(&self) -> &AckSet {
        &self.acks
    }

    #[inline]
    pub fn sent(&self) -> &SentLedger {
        &self.sent
    }

    #[inline]
    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    /// Rolling bytes-per-contact average.
    #[inline]
    pub fn avg_transferred_bytes(&self) -> u64 {
        self.window.average()
    }

    pub fn throttle_signals(&self) -> &[ThrottleSignal] {
        self.policy.throttle_signals()
    }

    #[inline]
    pub fn has_message(&self, id: MessageId) -> bool {
        self.buffer.contains(id)
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.buffer.get(id)
    }

    /// Whether `id` reached this host as its final recipient.
    #[inline]
    pub fn is_delivered(&self, id: MessageId) -> bool {
        self.delivered.contains(&id)
    }

    #[inline]
    pub fn is_sending(&self, id: MessageId) -> bool {
        self.outgoing.values().any(|&m| m == id)
    }

    #[inline]
    pub fn is_receiving(&self, id: MessageId) -> bool {
        self.incoming.contains_key(&id)
    }

    // ── Local operations ──────────────────────────────────────────────────

    /// Stamp TTL and protocol metadata on a new message and buffer it.
    /// Returns `false` if no room could be made.
    pub fn create_message(&mut self, mut msg: Message, now: f64) -> bool {
        msg.ttl = self.msg_ttl;
        msg.meta = self.policy.initial_meta();
        if !self.make_room(msg.size) {
            debug!(host = %self.host, message = %msg.id, "no room for new message");
            return false;
        }
        debug!(host = %self.host, message = %msg.id, to = %msg.to, size = msg.size, "message created");
        self.stats.created += 1;
        self.buffer.insert(msg, now);
        true
    }

    fn make_room(&mut self, size: u64) -> bool {
        let outgoing = &self.outgoing;
        match self.buffer.make_room(size, |id| outgoing.values().any(|&m| m == id)) {
            Some(evicted) => {
                for m in &evicted {
                    debug!(host = %self.host, message = %m.id, "evicted for space");
                }
                self.stats.dropped += evicted.len() as u64;
                true
            }
            None => false,
        }
    }

    /// Decide whether to accept `msg`.  `busy` is whether this host already
    /// has a transfer in flight.  Makes buffer room as a side effect of `Ok`.
    pub fn check_receiving(
        &mut self,
        msg: &Message,
        now: f64,
        busy: bool,
        has_energy: bool,
    ) -> ReceiveStatus {
        if busy {
            return ReceiveStatus::TryLaterBusy;
        }
        if self.buffer.contains(msg.id) || self.is_delivered(msg.id) || self.acks.contains(msg.id) {
            return ReceiveStatus::DeniedOld;
        }
        if msg.is_expired(now) && msg.to != self.host {
            return ReceiveStatus::DeniedTtl;
        }
        if !has_energy {
            return ReceiveStatus::DeniedLowResources;
        }
        if msg.to != self.host && !self.make_room(msg.size) {
            return ReceiveStatus::DeniedNoSpace;
        }
        ReceiveStatus::Ok
    }

    /// Delete buffered messages whose id is acknowledged, except those being
    /// sent.  Returns how many were removed.
    pub fn purge_acked(&mut self) -> usize {
        let doomed: Vec<MessageId> = self
            .buffer
            .iter()
            .map(|m| m.id)
            .filter(|&id| self.acks.contains(id) && !self.is_sending(id))
            .collect();
        for &id in &doomed {
            self.buffer.remove(id);
            trace!(host = %self.host, message = %id, "removed acked message");
        }
        self.stats.removed_by_ack += doomed.len() as u64;
        doomed.len()
    }

    /// Drop messages whose TTL ran out, except those being sent.
    pub fn drop_expired(&mut self, now: f64) -> usize {
        let expired: Vec<MessageId> = self
            .buffer
            .iter()
            .filter(|m| m.is_expired(now))
            .map(|m| m.id)
            .filter(|&id| !self.is_sending(id))
            .collect();
        for &id in &expired {
            self.buffer.remove(id);
            debug!(host = %self.host, message = %id, now, "message expired");
        }
        self.stats.dropped += expired.len() as u64;
        expired.len()
    }

    /// Buffered messages in the order they should be offered.
    pub(crate) fn queue(&mut self) -> Vec<MessageId> {
        let mut ids = self.buffer.ids();
        if self.queue_mode == QueueMode::Random {
            self.rng.shuffle(&mut ids);
        }
        ids
    }

    /// Relay candidates from the policy, in queue order.
    pub(crate) fn relay_queue(&mut self) -> RoutingResult<Vec<MessageId>> {
        let order = self.queue();
        let msgs: Vec<&Message> = order.iter().filter_map(|&id| self.buffer.get(id)).collect();
        let picked = self.policy.on_tick(self.host, &msgs)?;
        Ok(picked.iter().map(|m| m.id).collect())
    }

    /// Ack an id and drop the local copy unless it is being sent.
    pub(crate) fn ack_and_drop(&mut self, id: MessageId) {
        self.acks.insert(id);
        if !self.is_sending(id) && self.buffer.remove(id).is_some() {
            self.stats.removed_by_ack += 1;
        }
    }

    pub(crate) fn union_acks(&mut self, other: &AckSet) -> usize {
        self.acks.union(other)
    }

    pub(crate) fn on_contact(&mut self, now: f64) -> Option<ThrottleSignal> {
        self.policy.on_contact(now)
    }

    // ── Transfer bookkeeping ──────────────────────────────────────────────

    pub(crate) fn begin_send(&mut self, conn: ConnectionId, id: MessageId) {
        self.outgoing.insert(conn, id);
        self.stats.started += 1;
    }

    pub(crate) fn begin_receive(&mut self, msg: Message) {
        self.incoming.insert(msg.id, msg);
    }

    /// A link of this host closed after moving `bytes`.  `aborted` is the
    /// transfer it cut off, if any.
    pub fn connection_down(&mut self, conn: ConnectionId, bytes: f64, aborted: Option<&Transfer>) {
        self.window.push(bytes.max(0.0) as u64);
        if let Some(t) = aborted {
            if t.sender == self.host && self.outgoing.remove(&conn).is_some() {
                self.stats.aborted += 1;
                debug!(host = %self.host, message = %t.message, "outgoing transfer aborted");
            }
            if t.receiver == self.host {
                self.incoming.remove(&t.message);
            }
        }
    }

    /// Sender side of a completed transfer over `conn`.
    pub fn transfer_done(&mut self, conn: ConnectionId, t: &Transfer) -> RoutingResult<()> {
        self.outgoing.remove(&conn);
        self.sent.record(t.receiver, t.message);

        if !self.buffer.contains(t.message) {
            // Dropped after the transfer started; nothing left to update.
            return Ok(());
        }
        let host = self.host;
        let delivered = self.buffer.get(t.message).is_some_and(|m| m.to == t.receiver);
        if delivered {
            self.acks.insert(t.message);
            self.buffer.remove(t.message);
            return Ok(());
        }
        if let Some(msg) = self.buffer.get_mut(t.message) {
            self.policy.on_transfer_done(host, msg)?;
        }
        Ok(())
    }

    /// Receiver side of a completed transfer.  Returns the message if this
    /// host was its final recipient and had not seen it before.
    pub fn message_transferred(&mut self, t: &Transfer, now: f64) -> RoutingResult<Option<Message>> {
        let mut msg = self
            .incoming
            .remove(&t.message)
            .ok_or(RoutingError::UnknownIncoming { host: self.host, message: t.message })?;
        msg.hop_count += 1;

        if msg.to == self.host {
            self.acks.insert(msg.id);
            if !self.delivered.insert(msg.id) {
                return Ok(None);
            }
            self.stats.delivered += 1;
            debug!(host = %self.host, message = %msg.id, hops = msg.hop_count, now, "message delivered");
            return Ok(Some(msg));
        }

        if self.acks.contains(msg.id) {
            return Ok(None);
        }
        self.policy.on_received(self.host, &mut msg)?;
        if !self.make_room(msg.size) {
            self.stats.dropped += 1;
            return Ok(None);
        }
        self.stats.relayed += 1;
        self.buffer.insert(msg, now);
        Ok(None)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("host", &self.host)
            .field("kind", &self.kind())
            .field("buffered", &self.buffer.len())
            .field("acks", &self.acks.len())
            .finish()
    }
}
