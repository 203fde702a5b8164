//! All routers of a run, indexed by host, and the operations that touch two
//! of them at once.
//!
//! # Contact exchange
//!
//! Only the initiator of a new connection does the bookkeeping: it checks
//! both hosts run the same variant, unions the two ack sets both ways,
//! purges acknowledged messages on both sides and feeds its own policy the
//! contact (density counting).  The peer's router does nothing on `Up`, so
//! every contact is processed exactly once.
//!
//! # Scheduling
//!
//! A host with buffered messages and open links, and no transfer in flight,
//! tries in order:
//!
//! 1. its own messages addressed to a connected host;
//! 2. asking each idle peer to send a message addressed to this host;
//! 3. the policy's relay candidates over each link in turn.
//!
//! The first transfer started ends the attempt for this tick.

use tracing::{trace, warn};

use opp_core::{ConnectionId, HostId, MessageId};
use opp_net::{ConnectionChange, ConnectionEvent, HostState, Network, Transfer};

use crate::density::ThrottleSignal;
use crate::message::Message;
use crate::router::{ReceiveStatus, Router};
use crate::{RoutingError, RoutingResult};

#[derive(Debug, Default)]
pub struct RouterSet {
    routers: Vec<Router>,
}

impl RouterSet {
    /// `routers[i]` must belong to `HostId(i)`.
    pub fn from_routers(routers: Vec<Router>) -> RoutingResult<Self> {
        if let Some((index, r)) = routers.iter().enumerate().find(|(i, r)| r.host().index() != *i) {
            return Err(RoutingError::MisplacedRouter { index, host: r.host() });
        }
        Ok(Self { routers })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Router> + '_ {
        self.routers.iter()
    }

    pub fn get(&self, host: HostId) -> RoutingResult<&Router> {
        self.routers.get(host.index()).ok_or(RoutingError::UnknownHost(host))
    }

    pub fn get_mut(&mut self, host: HostId) -> RoutingResult<&mut Router> {
        self.routers.get_mut(host.index()).ok_or(RoutingError::UnknownHost(host))
    }

    /// Two distinct routers, mutably.
    pub fn pair_mut(&mut self, a: HostId, b: HostId) -> RoutingResult<(&mut Router, &mut Router)> {
        let (i, j) = (a.index(), b.index());
        if i == j {
            return Err(RoutingError::SelfTransfer(a));
        }
        if i.max(j) >= self.routers.len() {
            return Err(RoutingError::UnknownHost(if i >= self.routers.len() { a } else { b }));
        }
        if i < j {
            let (lo, hi) = self.routers.split_at_mut(j);
            Ok((&mut lo[i], &mut hi[0]))
        } else {
            let (lo, hi) = self.routers.split_at_mut(i);
            Ok((&mut hi[0], &mut lo[j]))
        }
    }

    /// Buffer a new message at its source host.
    pub fn create_message(&mut self, msg: Message, now: f64) -> RoutingResult<bool> {
        Ok(self.get_mut(msg.from)?.create_message(msg, now))
    }

    // ── Connection hooks ──────────────────────────────────────────────────

    /// Apply a connection change.  Returns a throttle signal if the
    /// initiator's density counter crossed its limit.
    pub fn on_connection_event(&mut self, ev: &ConnectionEvent) -> RoutingResult<Option<ThrottleSignal>> {
        match ev.change {
            ConnectionChange::Up => {
                let (init, peer) = self.pair_mut(ev.initiator, ev.peer)?;
                if init.kind() != peer.kind() {
                    return Err(RoutingError::RouterMismatch {
                        a:      ev.initiator,
                        a_kind: init.kind(),
                        b:      ev.peer,
                        b_kind: peer.kind(),
                    });
                }
                init.union_acks(peer.acks());
                peer.union_acks(init.acks());
                init.purge_acked();
                peer.purge_acked();
                Ok(init.on_contact(ev.at))
            }
            ConnectionChange::Down => {
                for host in [ev.initiator, ev.peer] {
                    self.get_mut(host)?.connection_down(
                        ev.connection,
                        ev.bytes_transferred,
                        ev.aborted.as_ref(),
                    );
                }
                Ok(None)
            }
        }
    }

    // ── Per-tick routing ──────────────────────────────────────────────────

    /// Routing phase for one host: finalize transfers it completed sending,
    /// drop expired messages, then try to start a transfer.  Returns the
    /// messages that reached their final recipient.
    pub fn update_host(
        &mut self,
        host: HostId,
        now: f64,
        net: &mut Network,
        hosts: &[HostState],
    ) -> RoutingResult<Vec<Message>> {
        let mut delivered = Vec::new();
        for (conn, t) in net.finish_transfers_from(host) {
            let (sender, receiver) = self.pair_mut(t.sender, t.receiver)?;
            sender.transfer_done(conn, &t)?;
            if let Some(m) = receiver.message_transferred(&t, now)? {
                delivered.push(m);
            }
        }
        self.get_mut(host)?.drop_expired(now);
        self.schedule(host, now, net, hosts)?;
        Ok(delivered)
    }

    fn schedule(
        &mut self,
        host: HostId,
        now: f64,
        net: &mut Network,
        hosts: &[HostState],
    ) -> RoutingResult<()> {
        let links: Vec<(ConnectionId, HostId)> = net
            .host_connections(host)
            .map(|c| (c.id, c.other_host(host)))
            .collect();
        if links.is_empty() || self.get(host)?.buffer().is_empty() || net.host_busy(host) {
            return Ok(());
        }

        // Messages for a connected final recipient.
        let queue = self.get_mut(host)?.queue();
        for &id in &queue {
            let Some(to) = self.get(host)?.message(id).map(|m| m.to) else { continue };
            for &(conn, peer) in &links {
                if peer == to && self.try_start(host, peer, conn, id, now, net, hosts)?.is_ok() {
                    return Ok(());
                }
            }
        }

        // Ask the peers for messages addressed to us.
        for &(conn, peer) in &links {
            if self.request_deliverable(peer, host, conn, now, net, hosts)? {
                return Ok(());
            }
        }

        // Relay.
        let relay = self.get_mut(host)?.relay_queue()?;
        if relay.is_empty() {
            return Ok(());
        }
        for &(conn, peer) in &links {
            for &id in &relay {
                match self.try_start(host, peer, conn, id, now, net, hosts)? {
                    ReceiveStatus::Ok => return Ok(()),
                    ReceiveStatus::TryLaterBusy => break,
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// `peer` tries to start one of its messages addressed to `requester`.
    fn request_deliverable(
        &mut self,
        peer: HostId,
        requester: HostId,
        conn: ConnectionId,
        now: f64,
        net: &mut Network,
        hosts: &[HostState],
    ) -> RoutingResult<bool> {
        if net.host_busy(peer) {
            return Ok(false);
        }
        let ids: Vec<MessageId> = self
            .get(peer)?
            .buffer()
            .iter()
            .filter(|m| m.to == requester)
            .map(|m| m.id)
            .collect();
        for id in ids {
            if self.try_start(peer, requester, conn, id, now, net, hosts)?.is_ok() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Offer message `id` from `sender` to `receiver` over `conn` and start
    /// the transfer if accepted.
    #[allow(clippy::too_many_arguments)]
    fn try_start(
        &mut self,
        sender: HostId,
        receiver: HostId,
        conn: ConnectionId,
        id: MessageId,
        now: f64,
        net: &mut Network,
        hosts: &[HostState],
    ) -> RoutingResult<ReceiveStatus> {
        if net.connection(conn).is_none_or(|c| c.is_transferring()) {
            return Ok(ReceiveStatus::TryLaterBusy);
        }
        let Some(msg) = self.get(sender)?.message(id).cloned() else {
            return Ok(ReceiveStatus::DeniedOld);
        };
        let busy = net.host_busy(receiver);
        let has_energy = hosts.get(receiver.index()).is_some_and(|h| h.has_energy);

        let (s, r) = self.pair_mut(sender, receiver)?;
        let status = r.check_receiving(&msg, now, busy, has_energy);
        trace!(%sender, %receiver, message = %id, ?status, "offer");
        match status {
            ReceiveStatus::Ok => {
                net.start_transfer(conn, Transfer::new(id, sender, receiver, msg.size))?;
                s.begin_send(conn, id);
                r.begin_receive(msg);
            }
            ReceiveStatus::DeniedOld if msg.to == receiver => {
                // The destination already has it.
                s.ack_and_drop(id);
            }
            ReceiveStatus::DeniedLowResources => {
                warn!(%sender, %receiver, message = %id, "receiver out of energy");
            }
            _ => {}
        }
        Ok(status)
    }
}
