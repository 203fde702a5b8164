//! Scan-round detection and scan-time accrual.
//!
//! A radio with a positive scan interval discovers peers in discrete rounds.
//! A round starts the first update after `last_scan + interval`.  On
//! detection the anchor moves to the exact boundary, or to `now` when more
//! than one update tick was missed, so missed rounds are never credited
//! retroactively.  An interval of zero means every update is a scan round.
//!
//! Scan energy is billed per detected round, prorated by the simulated time
//! since the previous billing; this module only accrues that time.

use tracing::trace;

#[derive(Clone, Debug, PartialEq)]
pub struct ScanClock {
    interval:    f64,
    last_scan:   f64,
    last_billed: f64,
    unbilled:    f64,
}

impl ScanClock {
    /// `anchor` is the time of the (virtual) previous scan; the interface is
    /// not scanning before it.
    pub fn new(interval: f64, anchor: f64) -> Self {
        Self { interval, last_scan: anchor, last_billed: anchor, unbilled: 0.0 }
    }

    #[inline]
    pub fn interval(&self) -> f64 {
        self.interval
    }

    #[inline]
    pub fn last_scan(&self) -> f64 {
        self.last_scan
    }

    /// Whether the radio is in a scan round at `now`.  Call once per tick,
    /// and only while the interface is active.
    pub fn update(&mut self, now: f64, update_interval: f64) -> bool {
        if self.interval <= 0.0 {
            self.accrue(now);
            return true;
        }
        if now < self.last_scan {
            return false;
        }
        let next = self.last_scan + self.interval;
        if now > next {
            self.last_scan = if now - next > update_interval { now } else { next };
            self.accrue(now);
            trace!(now, anchor = self.last_scan, "scan round");
            return true;
        }
        // Still in the round that started exactly at the anchor.
        now == self.last_scan
    }

    fn accrue(&mut self, now: f64) {
        if now > self.last_billed {
            self.unbilled += now - self.last_billed;
        }
        self.last_billed = now;
    }

    /// Seconds of scanning accrued since the last call.
    pub fn take_unbilled(&mut self) -> f64 {
        std::mem::take(&mut self.unbilled)
    }

    /// Drop accrued scan time and restart accrual at `now`.  Used for ticks
    /// where the radio was not scanning (asleep, inactive, transmitting).
    pub fn forgive(&mut self, now: f64) {
        self.unbilled = 0.0;
        self.last_billed = now;
    }

    /// Divisor for prorating scan energy.  Continuous scanning costs at most
    /// one `scanEnergy` per second.
    #[inline]
    pub fn billing_interval(&self) -> f64 {
        self.interval.max(1.0)
    }
}
