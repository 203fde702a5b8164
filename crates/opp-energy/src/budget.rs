//! Per-host energy budget.

use opp_core::{CoreResult, Scope, SettingRange, SimRng};
use tracing::{info, trace};

use crate::usage::{EnergyCategory, EnergyUsage};

/// `energyWarmup` value meaning "take the warmup from `Report.warmup`".
pub const WARMUP_FROM_REPORT: f64 = -1.0;

// ── EnergySettings ────────────────────────────────────────────────────────────

/// Per-group energy parameters, read once at setup.
///
/// | Key             | Default | Meaning                                   |
/// |-----------------|---------|-------------------------------------------|
/// | `initialEnergy` | none    | full charge, scalar or `min,max` range     |
/// | `baseEnergy`    | 0       | host base usage per second, scalar or range|
/// | `energyWarmup`  | 0       | seconds before any debit applies; `-1` reads `Report.warmup` |
#[derive(Clone, Debug, PartialEq)]
pub struct EnergySettings {
    pub initial: SettingRange,
    pub base:    SettingRange,
    pub warmup:  f64,
}

impl EnergySettings {
    pub fn from_settings(scope: &Scope<'_>) -> CoreResult<Self> {
        let initial = scope.range("initialEnergy")?;
        let base = scope.range_or("baseEnergy", 0.0)?;
        let mut warmup = scope.f64_or("energyWarmup", 0.0)?;
        if warmup == WARMUP_FROM_REPORT {
            warmup = scope.root().scoped("Report").f64_or("warmup", 0.0)?;
        }
        Ok(Self { initial, base, warmup })
    }
}

// ── EnergyBudget ──────────────────────────────────────────────────────────────

/// Remaining charge of one host.
///
/// `current` stays in `[0, full]` at all times.  Debits before `warmup`
/// seconds of simulated time are dropped.
#[derive(Clone, Debug)]
pub struct EnergyBudget {
    full:         f64,
    current:      f64,
    base_rate:    f64,
    warmup:       f64,
    last_update:  f64,
    exhausted_at: Option<f64>,
    usage:        EnergyUsage,
}

impl EnergyBudget {
    pub fn new(full: f64, base_rate: f64, warmup: f64) -> Self {
        let full = full.max(0.0);
        Self {
            full,
            current: full,
            base_rate,
            warmup,
            last_update: 0.0,
            exhausted_at: None,
            usage: EnergyUsage::default(),
        }
    }

    /// Build an instance from group settings, drawing ranged values from the
    /// energy stream.  The full-charge draw comes first, then the base rate.
    pub fn spawn(settings: &EnergySettings, rng: &mut SimRng) -> Self {
        let full = settings.initial.draw(rng);
        let base_rate = settings.base.draw(rng);
        Self::new(full, base_rate, settings.warmup)
    }

    /// Remove `amount` at simulated time `now` and return what was actually
    /// removed.  No-op before warmup; the charge floors at zero.
    pub fn debit(&mut self, amount: f64, now: f64) -> f64 {
        if now < self.warmup || !(amount > 0.0) || self.current <= 0.0 {
            return 0.0;
        }
        let removed = amount.min(self.current);
        self.current -= removed;
        if self.current <= 0.0 {
            self.current = 0.0;
            if self.exhausted_at.is_none() {
                self.exhausted_at = Some(now);
                info!(now, full = self.full, "energy exhausted");
            }
        }
        removed
    }

    /// [`debit`](Self::debit) and book the removed amount under `category`.
    pub fn charge(&mut self, category: EnergyCategory, amount: f64, now: f64) -> f64 {
        let removed = self.debit(amount, now);
        if removed > 0.0 {
            trace!(%category, removed, remaining = self.current, "energy debit");
            self.usage.record(category, removed);
        }
        removed
    }

    #[inline]
    pub fn has_energy(&self) -> bool {
        self.current > 0.0
    }

    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }

    #[inline]
    pub fn full(&self) -> f64 {
        self.full
    }

    /// Remaining charge as a fraction of full; `0.0` for a zero-capacity budget.
    pub fn level(&self) -> f64 {
        if self.full > 0.0 { self.current / self.full } else { 0.0 }
    }

    #[inline]
    pub fn base_rate(&self) -> f64 {
        self.base_rate
    }

    #[inline]
    pub fn warmup(&self) -> f64 {
        self.warmup
    }

    /// Simulated time the charge first reached zero.
    #[inline]
    pub fn exhausted_at(&self) -> Option<f64> {
        self.exhausted_at
    }

    #[inline]
    pub fn usage(&self) -> &EnergyUsage {
        &self.usage
    }

    /// Seconds since the last cost-model pass.
    #[inline]
    pub fn elapsed_since_update(&self, now: f64) -> f64 {
        now - self.last_update
    }

    #[inline]
    pub fn mark_updated(&mut self, now: f64) {
        self.last_update = now;
    }
}
