//! Contact-density tracking for the density-aware variant.
//!
//! Each contact closer than `time_limit` seconds to the previous one bumps
//! the counter; a longer gap resets it to 1.  A [`ThrottleSignal`] is
//! emitted when the counter first rises above `density_limit`.  Acting on
//! the signal (power-cycling radios, slowing scans) is left to whoever
//! consumes it.

/// Default `densityLimit`.
pub const DEFAULT_DENSITY_LIMIT: f64 = 3.0;
/// Default `timeLimit`, seconds.
pub const DEFAULT_TIME_LIMIT: f64 = 60.0;

/// The contact counter crossed the density limit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThrottleSignal {
    /// Simulated time of the crossing contact.
    pub at:       f64,
    /// Counter value after that contact.
    pub contacts: u32,
}

#[derive(Clone, Debug)]
pub struct DensityTracker {
    density_limit: f64,
    time_limit:    f64,
    contacts:      u32,
    last_contact:  f64,
    signals:       Vec<ThrottleSignal>,
}

impl DensityTracker {
    pub fn new(density_limit: f64, time_limit: f64) -> Self {
        Self { density_limit, time_limit, contacts: 0, last_contact: 0.0, signals: Vec::new() }
    }

    /// Count a contact at `now`.
    pub fn record_contact(&mut self, now: f64) -> Option<ThrottleSignal> {
        let before = self.contacts;
        if now > self.last_contact + self.time_limit {
            self.contacts = 1;
        } else {
            self.contacts += 1;
        }
        self.last_contact = now;

        let crossed = f64::from(before) <= self.density_limit
            && f64::from(self.contacts) > self.density_limit;
        if !crossed {
            return None;
        }
        let signal = ThrottleSignal { at: now, contacts: self.contacts };
        self.signals.push(signal);
        Some(signal)
    }

    #[inline]
    pub fn contacts(&self) -> u32 {
        self.contacts
    }

    #[inline]
    pub fn last_contact(&self) -> f64 {
        self.last_contact
    }

    #[inline]
    pub fn density_limit(&self) -> f64 {
        self.density_limit
    }

    #[inline]
    pub fn time_limit(&self) -> f64 {
        self.time_limit
    }

    /// Every crossing so far, in order.
    pub fn signals(&self) -> &[ThrottleSignal] {
        &self.signals
    }
}
