//! The `Sim` struct and its tick loop.

use tracing::{debug, info};

use opp_core::{HostId, MessageId, SimClock, SimConfig, Tick};
use opp_net::{HostState, Network, RTreeDiscovery, RangeDiscovery};
use opp_routing::{Message, Router, RouterSet};

use crate::energy::energy_phase;
use crate::movement::MovementProvider;
use crate::{Host, SimError, SimObserver, SimResult};

/// The main simulation runner.
///
/// `Sim<M, D>` holds all simulation state and drives the three-phase tick
/// loop:
///
/// 1. **Contact**: positions are refreshed from the movement provider and
///    every interface updates (sync sleep, link teardown, scan rounds, new
///    connections).  Each connection change reaches the routers before
///    anything else happens, so acknowledgements are exchanged before this
///    tick's transfers are scheduled.
/// 2. **Routing**: in-flight transfers advance by `speed × tick_secs` bytes,
///    then hosts in ascending id order finalize completed transfers, drop
///    expired messages and try to start a new transfer.
/// 3. **Energy**: every host with an energy model pays for the tick.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim<M: MovementProvider, D: RangeDiscovery = RTreeDiscovery> {
    /// Global configuration (tick length, total ticks, seed, …).
    pub config: SimConfig,

    /// Simulation clock; tracks the current tick and maps it to seconds.
    pub clock: SimClock,

    /// Hosts indexed by `HostId`.
    pub hosts: Vec<Host>,

    /// Interfaces and open connections.
    pub net: Network,

    /// One router per host, indexed by `HostId`.
    pub routers: RouterSet,

    /// Position source.  Public so callers can script positions between
    /// ticks.
    pub movement: M,

    discovery:    D,
    /// Per-host snapshot handed to the contact and routing phases.
    states:       Vec<HostState>,
    next_message: MessageId,
}

impl<M: MovementProvider, D: RangeDiscovery> Sim<M, D> {
    pub(crate) fn new(
        config: SimConfig,
        hosts: Vec<Host>,
        net: Network,
        routers: RouterSet,
        movement: M,
        discovery: D,
    ) -> Self {
        let states = hosts
            .iter()
            .map(|h| HostState::new(movement.location(h.id)))
            .collect();
        Self {
            clock: config.make_clock(),
            config,
            hosts,
            net,
            routers,
            movement,
            discovery,
            states,
            next_message: MessageId(0),
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Run the simulation from the current tick to `config.end_tick()`.
    ///
    /// Calls observer hooks at every tick boundary.  Use
    /// [`NoopObserver`][crate::NoopObserver] if you don't need callbacks.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        info!(ticks = self.config.total_ticks, tick_secs = self.config.tick_secs, "run started");
        while self.clock.current_tick < self.config.end_tick() {
            self.step(observer)?;
        }
        observer.on_sim_end(self.clock.current_tick);
        info!(
            at = self.clock.now(),
            delivered = self.routers.iter().map(|r| r.stats().delivered).sum::<u64>(),
            connections = self.net.connection_count(),
            "run finished"
        );
        Ok(())
    }

    /// Run exactly `n` ticks from the current position (ignores `end_tick`).
    ///
    /// Useful for tests and incremental stepping.
    pub fn run_ticks<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        for _ in 0..n {
            self.step(observer)?;
        }
        Ok(())
    }

    /// Simulated seconds at the current tick.
    #[inline]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn host(&self, id: HostId) -> SimResult<&Host> {
        self.hosts
            .get(id.index())
            .ok_or(SimError::Core(opp_core::CoreError::HostNotFound(id)))
    }

    pub fn router(&self, id: HostId) -> SimResult<&Router> {
        Ok(self.routers.get(id)?)
    }

    /// Create a message at `from` addressed to `to`, stamped with the current
    /// time.  Returns its id, or `None` if the source buffer had no room.
    pub fn create_message(&mut self, from: HostId, to: HostId, size: u64) -> SimResult<Option<MessageId>> {
        self.host(from)?;
        self.host(to)?;
        let id = self.next_message;
        self.next_message = id.next();
        let msg = Message::new(id, from, to, size, self.now());
        Ok(self.routers.create_message(msg, self.now())?.then_some(id))
    }

    // ── Core tick processing ──────────────────────────────────────────────

    fn step<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let tick = self.clock.current_tick;
        observer.on_tick_start(tick);
        self.process_tick(tick, observer)?;
        observer.on_tick_end(tick, self.net.connection_count());
        if self.config.snapshot_interval_ticks > 0
            && tick.0.is_multiple_of(self.config.snapshot_interval_ticks)
        {
            observer.on_snapshot(tick, &self.hosts, &self.net, &self.routers);
        }
        self.clock.advance();
        Ok(())
    }

    fn process_tick<O: SimObserver>(&mut self, tick: Tick, observer: &mut O) -> SimResult<()> {
        let now = self.clock.secs_at(tick);

        // ── Phase 0: host snapshot ────────────────────────────────────────
        self.movement.update(now);
        for (state, host) in self.states.iter_mut().zip(&self.hosts) {
            *state = HostState {
                location:        self.movement.location(host.id),
                movement_active: self.movement.is_active(host.id),
                has_energy:      host.has_energy(),
            };
        }

        // ── Phase 1: contact update ───────────────────────────────────────
        //
        // Routers see every change before any host schedules, so the ack
        // exchange of a new contact settles first.
        let events = self.net.update(now, &self.states, &mut self.discovery)?;
        for ev in &events {
            let signal = self.routers.on_connection_event(ev)?;
            observer.on_connection(ev);
            if let Some(s) = signal {
                debug!(host = %ev.initiator, contacts = s.contacts, now, "density limit crossed");
                observer.on_throttle(ev.initiator, s);
            }
        }

        // ── Phase 2: routing ──────────────────────────────────────────────
        self.net.advance_transfers(self.config.tick_secs);
        for h in 0..self.hosts.len() {
            let host = HostId(h as u32);
            let delivered = self.routers.update_host(host, now, &mut self.net, &self.states)?;
            for m in &delivered {
                observer.on_message_delivered(m, now);
            }
        }

        // ── Phase 3: energy ───────────────────────────────────────────────
        energy_phase(&mut self.hosts, &mut self.net, &self.states, now)
    }
}
