//! The interface/connection arena and the per-tick contact update.
//!
//! # Ownership
//!
//! [`Network`] owns every [`NetworkInterface`] (indexed by `InterfaceId`)
//! and every open [`Connection`] (keyed by `ConnectionId`).  Interfaces list
//! the ids of their connections; the symmetric-listing invariant is checked
//! on every disconnect.
//!
//! # Update order
//!
//! 1. Synchronized-sleep interfaces wake or sleep for this second of the day.
//! 2. The discovery index is rebuilt from discoverable interfaces.
//! 3. Interfaces are visited in id order: stale links are torn down, then a
//!    scanning interface connects to every eligible candidate in range.
//!
//! Every change is pushed to the listeners immediately and queued as a
//! [`ConnectionEvent`] returned from [`update`](Network::update).

use std::collections::BTreeMap;

use tracing::debug;

use opp_core::{ConnectionId, CoreError, HostId, InterfaceId, SimRng};

use crate::connection::{Connection, ConnectionChange, ConnectionEvent, ConnectionListener, Transfer};
use crate::discovery::RangeDiscovery;
use crate::interface::{HostState, NetworkInterface};
use crate::settings::InterfaceSettings;
use crate::{NetError, NetResult};

pub struct Network {
    update_interval: f64,
    interfaces:      Vec<NetworkInterface>,
    host_ifaces:     Vec<Vec<InterfaceId>>,
    connections:     BTreeMap<ConnectionId, Connection>,
    next_connection: ConnectionId,
    listeners:       Vec<Box<dyn ConnectionListener>>,
    pending:         Vec<ConnectionEvent>,
}

impl Network {
    /// `update_interval` is the tick length in seconds, used by scan-round
    /// re-anchoring.
    pub fn new(update_interval: f64) -> Self {
        Self {
            update_interval,
            interfaces: Vec::new(),
            host_ifaces: Vec::new(),
            connections: BTreeMap::new(),
            next_connection: ConnectionId(0),
            listeners: Vec::new(),
            pending: Vec::new(),
        }
    }

    // ── Construction ──────────────────────────────────────────────────────

    /// Instantiate an interface for `host` from a prototype.
    pub fn add_interface(
        &mut self,
        settings: &InterfaceSettings,
        host: HostId,
        rng: &mut SimRng,
    ) -> InterfaceId {
        let id = InterfaceId(self.interfaces.len() as u32);
        self.insert(settings.instantiate(id, host, rng))
    }

    /// Insert a ready-made interface; its `id` is reassigned.
    pub fn insert(&mut self, mut iface: NetworkInterface) -> InterfaceId {
        let id = InterfaceId(self.interfaces.len() as u32);
        iface.id = id;
        let host = iface.host.index();
        if self.host_ifaces.len() <= host {
            self.host_ifaces.resize_with(host + 1, Vec::new);
        }
        self.host_ifaces[host].push(id);
        self.interfaces.push(iface);
        id
    }

    pub fn add_listener(&mut self, listener: Box<dyn ConnectionListener>) {
        self.listeners.push(listener);
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    #[inline]
    pub fn update_interval(&self) -> f64 {
        self.update_interval
    }

    #[inline]
    pub fn interfaces(&self) -> &[NetworkInterface] {
        &self.interfaces
    }

    pub fn interface(&self, id: InterfaceId) -> NetResult<&NetworkInterface> {
        self.interfaces.get(id.index()).ok_or(NetError::UnknownInterface(id))
    }

    pub fn interface_mut(&mut self, id: InterfaceId) -> NetResult<&mut NetworkInterface> {
        self.interfaces.get_mut(id.index()).ok_or(NetError::UnknownInterface(id))
    }

    /// Interfaces of `host`, in creation order.
    pub fn interfaces_of(&self, host: HostId) -> &[InterfaceId] {
        self.host_ifaces.get(host.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    #[inline]
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// All open connections in id order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> + '_ {
        self.connections.values()
    }

    #[inline]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Open connections of `host` across all its interfaces.
    pub fn host_connections(&self, host: HostId) -> impl Iterator<Item = &Connection> + '_ {
        self.interfaces_of(host)
            .iter()
            .flat_map(move |i| self.interfaces[i.index()].connections())
            .filter_map(move |c| self.connections.get(c))
    }

    pub fn are_connected(&self, a: InterfaceId, b: InterfaceId) -> bool {
        self.interfaces.get(a.index()).is_some_and(|ia| {
            ia.connections()
                .iter()
                .filter_map(|c| self.connections.get(c))
                .any(|c| c.other_iface(a) == b)
        })
    }

    fn iface_connections(&self, iface: InterfaceId) -> impl Iterator<Item = &Connection> + '_ {
        self.interfaces
            .get(iface.index())
            .map(NetworkInterface::connections)
            .unwrap_or(&[])
            .iter()
            .filter_map(|c| self.connections.get(c))
    }

    pub fn is_transferring(&self, iface: InterfaceId) -> bool {
        self.iface_connections(iface).any(Connection::is_transferring)
    }

    /// Whether `iface` is sending on any of its links.
    pub fn is_transmitting(&self, iface: InterfaceId) -> bool {
        let Ok(host) = self.interface(iface).map(|i| i.host) else { return false };
        self.iface_connections(iface).any(|c| c.is_sending(host))
    }

    pub fn is_receiving(&self, iface: InterfaceId) -> bool {
        let Ok(host) = self.interface(iface).map(|i| i.host) else { return false };
        self.iface_connections(iface).any(|c| c.is_receiving(host))
    }

    /// Whether any link of `host` carries a transfer, in either direction.
    pub fn host_busy(&self, host: HostId) -> bool {
        self.host_connections(host).any(Connection::is_transferring)
    }

    // ── Connect / disconnect ──────────────────────────────────────────────

    /// Open a connection from `a` (initiator) to `b`.  Both radios must be
    /// active for their host in `hosts` and within each other's range.
    pub fn connect(
        &mut self,
        a: InterfaceId,
        b: InterfaceId,
        now: f64,
        hosts: &[HostState],
    ) -> NetResult<ConnectionId> {
        let (ia, ib) = (self.interface(a)?, self.interface(b)?);
        let invalid = |reason| NetError::InvalidConnection { a, b, reason };
        let (ha, hb) = (host_state(hosts, ia.host)?, host_state(hosts, ib.host)?);
        if !ia.is_active(ha, now) || !ib.is_active(hb, now) {
            return Err(invalid("interface not active"));
        }
        if ha.location.distance(hb.location) > ia.range.min(ib.range) {
            return Err(invalid("out of range"));
        }
        self.open(a, b, now)
    }

    fn open(&mut self, a: InterfaceId, b: InterfaceId, now: f64) -> NetResult<ConnectionId> {
        let (ia, ib) = (self.interface(a)?, self.interface(b)?);
        let invalid = |reason| NetError::InvalidConnection { a, b, reason };
        if ia.host == ib.host {
            return Err(invalid("interfaces on the same host"));
        }
        if ia.kind != ib.kind {
            return Err(invalid("interface types differ"));
        }
        let (from_host, to_host) = (ia.host, ib.host);
        let speed = ia.speed.min(ib.speed);
        let kind = ia.kind.clone();
        if self.are_connected(a, b) {
            return Err(invalid("already connected"));
        }

        let id = self.next_connection;
        self.next_connection = id.next();

        self.connections.insert(id, Connection::new(id, (a, from_host), (b, to_host), speed, now));
        self.interfaces[a.index()].attach(id);
        self.interfaces[b.index()].attach(id);

        debug!(connection = %id, %from_host, %to_host, %kind, now, "connection up");
        for l in self.listeners.iter_mut() {
            l.hosts_connected(&kind, from_host, to_host);
        }
        self.pending.push(ConnectionEvent {
            change: ConnectionChange::Up,
            connection: id,
            initiator: from_host,
            peer: to_host,
            kind,
            at: now,
            bytes_transferred: 0.0,
            aborted: None,
        });
        Ok(id)
    }

    /// Tear down `id` on both sides.  An in-flight transfer is aborted and
    /// reported in the queued event.
    pub fn disconnect(&mut self, id: ConnectionId, now: f64) -> NetResult<()> {
        let mut conn = self.connections.remove(&id).ok_or(NetError::UnknownConnection(id))?;
        let aborted = conn.close();
        for iface in [conn.from_iface, conn.to_iface] {
            if !self.interface_mut(iface)?.detach(id) {
                return Err(NetError::MissingPeerConnection { connection: id, interface: iface });
            }
        }

        let kind = self.interfaces[conn.from_iface.index()].kind.clone();
        debug!(
            connection = %id,
            from_host = %conn.from_host,
            to_host = %conn.to_host,
            bytes = conn.bytes_transferred(),
            aborted = aborted.is_some(),
            now,
            "connection down"
        );
        for l in self.listeners.iter_mut() {
            l.hosts_disconnected(&kind, conn.from_host, conn.to_host);
        }
        self.pending.push(ConnectionEvent {
            change: ConnectionChange::Down,
            connection: id,
            initiator: conn.from_host,
            peer: conn.to_host,
            kind,
            at: now,
            bytes_transferred: conn.bytes_transferred(),
            aborted,
        });
        Ok(())
    }

    /// Disconnect every link of `iface`.
    pub fn destroy_all(&mut self, iface: InterfaceId, now: f64) -> NetResult<()> {
        let ids = self.interface(iface)?.connections().to_vec();
        for id in ids {
            self.disconnect(id, now)?;
        }
        Ok(())
    }

    /// Put `iface` to sleep unless it is mid-transfer and `force_sleep` is
    /// off.  Returns the resulting sleep flag.
    pub fn sleep(
        &mut self,
        iface: InterfaceId,
        force_sleep: bool,
        force_disconnect: bool,
        now: f64,
    ) -> NetResult<bool> {
        if force_sleep || !self.is_transferring(iface) {
            self.interface_mut(iface)?.set_asleep();
            if force_disconnect {
                self.destroy_all(iface, now)?;
            }
        }
        Ok(self.interface(iface)?.is_asleep())
    }

    pub fn wakeup(&mut self, iface: InterfaceId) -> NetResult<()> {
        self.interface_mut(iface)?.wakeup();
        Ok(())
    }

    /// Events queued by direct `connect`/`disconnect`/`sleep` calls.
    pub fn drain_events(&mut self) -> Vec<ConnectionEvent> {
        std::mem::take(&mut self.pending)
    }

    // ── Per-tick update ───────────────────────────────────────────────────

    /// Run one contact update.  `hosts` is indexed by `HostId`.
    pub fn update<D>(
        &mut self,
        now: f64,
        hosts: &[HostState],
        discovery: &mut D,
    ) -> NetResult<Vec<ConnectionEvent>>
    where
        D: RangeDiscovery + ?Sized,
    {
        for idx in 0..self.interfaces.len() {
            let Some(sync) = self.interfaces[idx].sync_sleep() else { continue };
            let id = self.interfaces[idx].id;
            if sync.is_awake(now) {
                self.interfaces[idx].wakeup();
            } else {
                self.sleep(id, false, false, now)?;
            }
        }

        let mut entries = Vec::with_capacity(self.interfaces.len());
        for iface in self.interfaces.iter().filter(|i| i.is_discoverable()) {
            entries.push((iface.id, host_state(hosts, iface.host)?.location));
        }
        discovery.rebuild(entries);

        let mut candidates = Vec::new();
        for idx in 0..self.interfaces.len() {
            let id = self.interfaces[idx].id;
            let host = *host_state(hosts, self.interfaces[idx].host)?;

            let open = self.interfaces[idx].connections().to_vec();
            for conn in open {
                if self.link_broken(id, conn, now, hosts)? {
                    self.disconnect(conn, now)?;
                }
            }

            let update_interval = self.update_interval;
            let me = &mut self.interfaces[idx];
            if !me.update_scanning(&host, now, update_interval) || !me.is_discoverable() {
                continue;
            }
            let range = me.range;

            candidates.clear();
            discovery.within(host.location, range, &mut candidates);
            candidates.sort_unstable();
            for &other in &candidates {
                if self.can_connect(id, other, now, hosts)? {
                    self.open(id, other, now)?;
                    self.interfaces[idx].record_contact(now);
                }
            }
        }

        Ok(std::mem::take(&mut self.pending))
    }

    /// Out of range, or (if `checker` disconnects inactive links) either
    /// side no longer active.
    fn link_broken(
        &self,
        checker: InterfaceId,
        conn: ConnectionId,
        now: f64,
        hosts: &[HostState],
    ) -> NetResult<bool> {
        let c = self.connections.get(&conn).ok_or(NetError::UnknownConnection(conn))?;
        let (a, b) = (self.interface(c.from_iface)?, self.interface(c.to_iface)?);
        let (ha, hb) = (host_state(hosts, a.host)?, host_state(hosts, b.host)?);

        if ha.location.distance(hb.location) > a.range.min(b.range) {
            return Ok(true);
        }
        let inactive = !a.is_active(ha, now) || !b.is_active(hb, now);
        Ok(inactive && self.interface(checker)?.disconnects_when_inactive())
    }

    fn can_connect(
        &self,
        a: InterfaceId,
        b: InterfaceId,
        now: f64,
        hosts: &[HostState],
    ) -> NetResult<bool> {
        if a == b {
            return Ok(false);
        }
        let (ia, ib) = (self.interface(a)?, self.interface(b)?);
        if ia.host == ib.host || ia.kind != ib.kind {
            return Ok(false);
        }
        let (ha, hb) = (host_state(hosts, ia.host)?, host_state(hosts, ib.host)?);
        Ok(ib.is_active(hb, now)
            && ha.location.distance(hb.location) <= ia.range.min(ib.range)
            && !self.are_connected(a, b))
    }

    // ── Transfers ─────────────────────────────────────────────────────────

    pub fn start_transfer(&mut self, conn: ConnectionId, transfer: Transfer) -> NetResult<()> {
        let c = self.connections.get_mut(&conn).ok_or(NetError::UnknownConnection(conn))?;
        let (message, sender, receiver) = (transfer.message, transfer.sender, transfer.receiver);
        if !c.begin(transfer) {
            return Err(NetError::TransferInProgress(conn));
        }
        debug!(connection = %conn, %message, %sender, %receiver, "transfer started");
        Ok(())
    }

    /// Advance every in-flight transfer by `secs` of link time.
    pub fn advance_transfers(&mut self, secs: f64) {
        for c in self.connections.values_mut() {
            c.advance(secs);
        }
    }

    /// Take every completed transfer `sender` is sending.
    pub fn finish_transfers_from(&mut self, sender: HostId) -> Vec<(ConnectionId, Transfer)> {
        let ids: Vec<ConnectionId> = self
            .host_connections(sender)
            .filter(|c| c.is_sending(sender) && c.is_transfer_done())
            .map(|c| c.id)
            .collect();
        let mut done = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(t) = self.connections.get_mut(&id).and_then(Connection::finish) {
                debug!(connection = %id, message = %t.message, %sender, receiver = %t.receiver, "transfer done");
                done.push((id, t));
            }
        }
        done
    }
}

fn host_state(hosts: &[HostState], host: HostId) -> NetResult<&HostState> {
    hosts.get(host.index()).ok_or(NetError::Core(CoreError::HostNotFound(host)))
}
