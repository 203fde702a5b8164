//! Simulation observer trait for progress reporting and data collection.

use opp_core::{HostId, Tick};
use opp_net::{ConnectionEvent, Network};
use opp_routing::{Message, RouterSet, ThrottleSignal};

use crate::Host;

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] at key points in the
/// tick loop.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
///
/// # Example: delivery counter
///
/// ```rust,ignore
/// struct Deliveries(u64);
///
/// impl SimObserver for Deliveries {
///     fn on_message_delivered(&mut self, _msg: &Message, _now: f64) {
///         self.0 += 1;
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called at the very start of each tick, before any processing.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called at the end of each tick with the number of open connections.
    fn on_tick_end(&mut self, _tick: Tick, _connections: usize) {}

    /// A connection came up or went down.  Called after the routers saw it.
    fn on_connection(&mut self, _event: &ConnectionEvent) {}

    /// A message reached its final recipient for the first time.
    fn on_message_delivered(&mut self, _msg: &Message, _now: f64) {}

    /// A density-aware router's contact counter crossed its limit.
    fn on_throttle(&mut self, _host: HostId, _signal: ThrottleSignal) {}

    /// Called every `config.snapshot_interval_ticks` ticks with read-only
    /// access to hosts, interfaces and routers, so reporters can sample
    /// energy levels or buffer occupancy without the sim knowing any output
    /// format.
    fn on_snapshot(
        &mut self,
        _tick:    Tick,
        _hosts:   &[Host],
        _net:     &Network,
        _routers: &RouterSet,
    ) {}

    /// Called once after the final tick completes.
    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
