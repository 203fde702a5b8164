//! Per-radio contact state.
//!
//! A [`NetworkInterface`] is owned by the [`Network`](crate::Network) arena
//! and refers to its host by id.  Host-level facts the interface needs
//! (movement, energy, location) arrive each tick as a [`HostState`]
//! snapshot, so the interface never borrows its host.

use opp_core::{hour_of_day, ConnectionId, Coord, HostId, InterfaceId};

use crate::activeness::{ActivenessSchedule, SyncSleep};
use crate::scan::ScanClock;

/// What the contact layer needs to know about a host this tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HostState {
    pub location:        Coord,
    pub movement_active: bool,
    pub has_energy:      bool,
}

impl HostState {
    pub fn new(location: Coord) -> Self {
        Self { location, movement_active: true, has_energy: true }
    }
}

/// Energy rates of one interface, drawn at creation.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct InterfaceRates {
    /// Per scan interval.
    pub scan:     f64,
    /// Per second sending.
    pub transmit: f64,
    /// Per second receiving.
    pub receive:  f64,
    /// Per second awake.
    pub base:     f64,
    /// Per second asleep.
    pub sleep:    f64,
}

#[derive(Clone, Debug)]
pub struct NetworkInterface {
    pub id:    InterfaceId,
    pub host:  HostId,
    pub kind:  String,
    pub range: f64,
    /// Bytes per second.
    pub speed: f64,
    pub rates: InterfaceRates,
    pub scan:  ScanClock,

    asleep:                   bool,
    disconnect_when_inactive: bool,
    sync_sleep:               Option<SyncSleep>,
    schedule:                 Option<ActivenessSchedule>,
    jitter:                   f64,
    connections:              Vec<ConnectionId>,
    contacts_by_hour:         [u32; 24],
}

impl NetworkInterface {
    pub fn new(
        id: InterfaceId,
        host: HostId,
        kind: String,
        range: f64,
        speed: f64,
        rates: InterfaceRates,
        scan: ScanClock,
    ) -> Self {
        Self {
            id,
            host,
            kind,
            range,
            speed,
            rates,
            scan,
            asleep: false,
            disconnect_when_inactive: true,
            sync_sleep: None,
            schedule: None,
            jitter: 0.0,
            connections: Vec::new(),
            contacts_by_hour: [0; 24],
        }
    }

    pub fn with_sync_sleep(mut self, sync_sleep: Option<SyncSleep>) -> Self {
        self.sync_sleep = sync_sleep;
        self
    }

    pub fn with_schedule(mut self, schedule: Option<ActivenessSchedule>, jitter: f64) -> Self {
        self.schedule = schedule;
        self.jitter = jitter;
        self
    }

    pub fn disconnect_when_inactive(mut self, on: bool) -> Self {
        self.disconnect_when_inactive = on;
        self
    }

    // ── State queries ─────────────────────────────────────────────────────

    /// Authoritative on/off test: awake, host moving, host has energy, and
    /// inside the group schedule (shifted by this interface's jitter).
    pub fn is_active(&self, host: &HostState, now: f64) -> bool {
        if self.asleep || !host.movement_active || !host.has_energy {
            return false;
        }
        match &self.schedule {
            None => true,
            Some(schedule) => schedule.is_active(now, self.jitter),
        }
    }

    #[inline]
    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    /// Whether discovery may find this interface at all.
    #[inline]
    pub fn is_discoverable(&self) -> bool {
        self.range > 0.0
    }

    #[inline]
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    #[inline]
    pub fn sync_sleep(&self) -> Option<SyncSleep> {
        self.sync_sleep
    }

    #[inline]
    pub fn disconnects_when_inactive(&self) -> bool {
        self.disconnect_when_inactive
    }

    #[inline]
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    /// Connections this interface initiated, bucketed by hour of day.
    #[inline]
    pub fn contacts_by_hour(&self) -> &[u32; 24] {
        &self.contacts_by_hour
    }

    /// Scan-round test for this tick; never scanning while inactive.
    pub fn update_scanning(&mut self, host: &HostState, now: f64, update_interval: f64) -> bool {
        if !self.is_active(host, now) {
            return false;
        }
        self.scan.update(now, update_interval)
    }

    // ── Mutation (via Network) ────────────────────────────────────────────

    /// Clear the sleep flag.
    #[inline]
    pub fn wakeup(&mut self) {
        self.asleep = false;
    }

    pub(crate) fn set_asleep(&mut self) {
        self.asleep = true;
    }

    pub(crate) fn attach(&mut self, connection: ConnectionId) {
        self.connections.push(connection);
    }

    /// Remove `connection`; `false` if it was not listed.
    pub(crate) fn detach(&mut self, connection: ConnectionId) -> bool {
        match self.connections.iter().position(|&c| c == connection) {
            Some(pos) => {
                self.connections.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn record_contact(&mut self, now: f64) {
        self.contacts_by_hour[hour_of_day(now)] += 1;
    }
}
