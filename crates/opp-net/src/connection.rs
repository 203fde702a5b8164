//! Bidirectional links between two interfaces and the messages in flight
//! over them.

use opp_core::{ConnectionId, HostId, InterfaceId, MessageId};

// ── Transfer ──────────────────────────────────────────────────────────────────

/// A message being copied from `sender` to `receiver`.
#[derive(Clone, Debug, PartialEq)]
pub struct Transfer {
    pub message:  MessageId,
    pub sender:   HostId,
    pub receiver: HostId,
    /// Bytes.
    pub size:     u64,
    /// Bytes copied so far.
    pub progress: f64,
}

impl Transfer {
    pub fn new(message: MessageId, sender: HostId, receiver: HostId, size: u64) -> Self {
        Self { message, sender, receiver, size, progress: 0.0 }
    }

    #[inline]
    pub fn remaining(&self) -> f64 {
        (self.size as f64 - self.progress).max(0.0)
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.progress >= self.size as f64
    }
}

// ── Connection ────────────────────────────────────────────────────────────────

/// A link shared by two interfaces on different hosts.
///
/// The `from_*` side initiated the connection.  At most one transfer is in
/// flight at a time, in either direction.
#[derive(Clone, Debug)]
pub struct Connection {
    pub id:         ConnectionId,
    pub from_iface: InterfaceId,
    pub to_iface:   InterfaceId,
    pub from_host:  HostId,
    pub to_host:    HostId,
    /// Bytes per second, the slower of the two interfaces.
    pub speed:      f64,
    pub opened_at:  f64,

    up:                bool,
    bytes_transferred: f64,
    transfer:          Option<Transfer>,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        from: (InterfaceId, HostId),
        to: (InterfaceId, HostId),
        speed: f64,
        opened_at: f64,
    ) -> Self {
        Self {
            id,
            from_iface: from.0,
            to_iface: to.0,
            from_host: from.1,
            to_host: to.1,
            speed,
            opened_at,
            up: true,
            bytes_transferred: 0.0,
            transfer: None,
        }
    }

    #[inline]
    pub fn is_up(&self) -> bool {
        self.up
    }

    #[inline]
    pub fn is_initiator(&self, host: HostId) -> bool {
        self.from_host == host
    }

    /// The host at the other end from `host`.
    #[inline]
    pub fn other_host(&self, host: HostId) -> HostId {
        if host == self.from_host { self.to_host } else { self.from_host }
    }

    #[inline]
    pub fn other_iface(&self, iface: InterfaceId) -> InterfaceId {
        if iface == self.from_iface { self.to_iface } else { self.from_iface }
    }

    /// The interface of `host` on this link.
    #[inline]
    pub fn iface_of(&self, host: HostId) -> InterfaceId {
        if host == self.from_host { self.from_iface } else { self.to_iface }
    }

    /// Total bytes moved over this link, partial transfers included.
    #[inline]
    pub fn bytes_transferred(&self) -> f64 {
        self.bytes_transferred
    }

    #[inline]
    pub fn transfer(&self) -> Option<&Transfer> {
        self.transfer.as_ref()
    }

    #[inline]
    pub fn is_transferring(&self) -> bool {
        self.transfer.is_some()
    }

    /// Whether `host` is sending the in-flight message.
    #[inline]
    pub fn is_sending(&self, host: HostId) -> bool {
        self.transfer.as_ref().is_some_and(|t| t.sender == host)
    }

    /// Whether `host` is receiving the in-flight message.
    #[inline]
    pub fn is_receiving(&self, host: HostId) -> bool {
        self.transfer.as_ref().is_some_and(|t| t.receiver == host)
    }

    /// Whether a completed transfer is waiting to be finalized.
    #[inline]
    pub fn is_transfer_done(&self) -> bool {
        self.transfer.as_ref().is_some_and(Transfer::is_complete)
    }

    pub(crate) fn begin(&mut self, transfer: Transfer) -> bool {
        if self.transfer.is_some() || !self.up {
            return false;
        }
        self.transfer = Some(transfer);
        true
    }

    /// Move the in-flight transfer forward by `secs` at link speed.
    pub(crate) fn advance(&mut self, secs: f64) {
        if let Some(t) = self.transfer.as_mut() {
            let step = (self.speed * secs).min(t.remaining());
            t.progress += step;
            self.bytes_transferred += step;
        }
    }

    /// Take the transfer if it is complete.
    pub(crate) fn finish(&mut self) -> Option<Transfer> {
        if self.is_transfer_done() { self.transfer.take() } else { None }
    }

    pub(crate) fn close(&mut self) -> Option<Transfer> {
        self.up = false;
        self.transfer.take()
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectionChange {
    Up,
    Down,
}

/// A connection coming up or going down, in the order it happened.
#[derive(Clone, Debug)]
pub struct ConnectionEvent {
    pub change:            ConnectionChange,
    pub connection:        ConnectionId,
    pub initiator:         HostId,
    pub peer:              HostId,
    pub kind:              String,
    pub at:                f64,
    /// Total bytes moved over the link; 0 on `Up`.
    pub bytes_transferred: f64,
    /// Transfer cut off by the disconnect, if any.
    pub aborted:           Option<Transfer>,
}

/// Subscriber to connection changes, notified synchronously as links open
/// and close.
pub trait ConnectionListener {
    fn hosts_connected(&mut self, kind: &str, initiator: HostId, peer: HostId);
    fn hosts_disconnected(&mut self, kind: &str, initiator: HostId, peer: HostId);
}
