//! Simulation time model.
//!
//! # Design
//!
//! Time advances in fixed update ticks.  The canonical counter is the integer
//! `Tick`; the simulated time in seconds is derived from it:
//!
//!   now_secs = tick * tick_secs
//!
//! Deriving seconds from an integer counter (instead of accumulating
//! `now += tick_secs`) keeps the clock free of floating-point drift over long
//! runs, which matters for scan-round boundaries that compare `now` against
//! exact multiples of a scan interval.

use std::fmt;

use crate::{CoreError, CoreResult, Settings};

/// Seconds in one simulated day, the period of synchronized sleep cycles.
pub const SECS_PER_DAY: f64 = 86_400.0;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Maps the tick counter to simulated seconds.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Simulated seconds per update tick (the update interval).
    pub tick_secs: f64,
    /// The current tick, advanced by `SimClock::advance()` each iteration.
    pub current_tick: Tick,
}

impl SimClock {
    pub fn new(tick_secs: f64) -> Self {
        Self { tick_secs, current_tick: Tick::ZERO }
    }

    /// Advance the clock by one tick.
    #[inline]
    pub fn advance(&mut self) {
        self.current_tick = Tick(self.current_tick.0 + 1);
    }

    /// Simulated seconds since tick 0.
    #[inline]
    pub fn now(&self) -> f64 {
        self.secs_at(self.current_tick)
    }

    /// Simulated seconds at an arbitrary tick.
    #[inline]
    pub fn secs_at(&self, tick: Tick) -> f64 {
        tick.0 as f64 * self.tick_secs
    }

    /// Break elapsed time into (day, hour, minute) components for logging.
    pub fn elapsed_dhm(&self) -> (u64, u32, u32) {
        let total_secs = self.now().max(0.0) as u64;
        let days = total_secs / 86_400;
        let hours = ((total_secs % 86_400) / 3_600) as u32;
        let minutes = ((total_secs % 3_600) / 60) as u32;
        (days, hours, minutes)
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (d, h, m) = self.elapsed_dhm();
        write!(f, "{} (day {} {:02}:{:02})", self.current_tick, d, h, m)
    }
}

/// Hour of the simulated day (0–23) at `now` seconds.
#[inline]
pub fn hour_of_day(now: f64) -> usize {
    ((now.rem_euclid(SECS_PER_DAY)) / 3_600.0) as usize % 24
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Top-level run configuration.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Simulated seconds per tick.  Must be > 0.
    pub tick_secs: f64,

    /// Total ticks to simulate.
    pub total_ticks: u64,

    /// Master RNG seed.  The same seed always produces identical results.
    pub seed: u64,

    /// Call the observer's snapshot hook every N ticks.  0 disables snapshots.
    pub snapshot_interval_ticks: u64,
}

impl SimConfig {
    /// The tick at which the simulation ends (exclusive upper bound).
    #[inline]
    pub fn end_tick(&self) -> Tick {
        Tick(self.total_ticks)
    }

    /// Construct a `SimClock` pre-configured for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.tick_secs)
    }

    /// Read the `Scenario` namespace.
    ///
    /// | Key                        | Default | Meaning                     |
    /// |----------------------------|---------|-----------------------------|
    /// | `Scenario.updateInterval`  | 1.0     | seconds per tick            |
    /// | `Scenario.endTime`         | none    | run length in seconds       |
    /// | `Scenario.seed`            | 0       | master seed                 |
    /// | `Scenario.snapshotInterval`| 0       | seconds between snapshots   |
    pub fn from_settings(settings: &Settings) -> CoreResult<Self> {
        let s = settings.scoped("Scenario");
        let tick_secs = s.f64_or("updateInterval", 1.0)?;
        if !(tick_secs > 0.0) {
            return Err(CoreError::invalid(
                "Scenario.updateInterval",
                &tick_secs.to_string(),
                "must be greater than zero",
            ));
        }
        let end_time = s.f64("endTime")?;
        if end_time < 0.0 {
            return Err(CoreError::invalid(
                "Scenario.endTime",
                &end_time.to_string(),
                "must not be negative",
            ));
        }
        let snapshot_secs = s.f64_or("snapshotInterval", 0.0)?;

        Ok(Self {
            tick_secs,
            total_ticks: (end_time / tick_secs).ceil() as u64,
            seed: s.u64_or("seed", 0)?,
            snapshot_interval_ticks: (snapshot_secs / tick_secs).round() as u64,
        })
    }
}
