//! Time-based radio on/off rules.

use opp_core::{CoreError, CoreResult, Scope, SECS_PER_DAY};

// ── ActivenessSchedule ────────────────────────────────────────────────────────

/// Group-level list of `[start, end]` windows (simulated seconds) during
/// which the radios of the group are active.
///
/// Parsed from `activeTimes = start1,end1,start2,end2,...`.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivenessSchedule {
    windows: Vec<(f64, f64)>,
}

impl ActivenessSchedule {
    pub fn new(windows: Vec<(f64, f64)>) -> Self {
        Self { windows }
    }

    /// Read `activeTimes` if present.
    pub fn from_settings(scope: &Scope<'_>) -> CoreResult<Option<Self>> {
        if !scope.contains("activeTimes") {
            return Ok(None);
        }
        let values = scope.csv_f64("activeTimes")?;
        let key = format!("{}.activeTimes", scope.namespace());
        if values.len() % 2 != 0 {
            return Err(invalid(&key, &values, "expected start,end pairs"));
        }
        let windows: Vec<(f64, f64)> = values.chunks(2).map(|w| (w[0], w[1])).collect();
        if windows.iter().any(|&(s, e)| s > e) {
            return Err(invalid(&key, &values, "window start after its end"));
        }
        Ok(Some(Self::new(windows)))
    }

    /// Active when `now + offset` falls inside any window.
    pub fn is_active(&self, now: f64, offset: f64) -> bool {
        let t = now + offset;
        self.windows.iter().any(|&(start, end)| t >= start && t <= end)
    }

    pub fn windows(&self) -> &[(f64, f64)] {
        &self.windows
    }
}

// ── SyncSleep ─────────────────────────────────────────────────────────────────

/// Synchronized intermittent sleep: awake for the first `awake` seconds of
/// every `total`-second cycle of the simulated day.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SyncSleep {
    pub awake: f64,
    pub total: f64,
}

impl SyncSleep {
    /// Read `syncIS = awake,total`.  Rejects `awake >= total`.
    pub fn from_settings(scope: &Scope<'_>) -> CoreResult<Option<Self>> {
        if !scope.contains("syncIS") {
            return Ok(None);
        }
        let (awake, total) = scope.pair("syncIS")?;
        let key = format!("{}.syncIS", scope.namespace());
        if awake < 0.0 || total <= 0.0 {
            return Err(invalid(&key, &[awake, total], "times must be positive"));
        }
        if awake >= total {
            return Err(invalid(&key, &[awake, total], "awake time must be less than total time"));
        }
        Ok(Some(Self { awake, total }))
    }

    pub fn is_awake(&self, now: f64) -> bool {
        let secs_of_day = now.rem_euclid(SECS_PER_DAY).floor();
        secs_of_day % self.total < self.awake
    }
}

fn invalid(key: &str, values: &[f64], reason: &str) -> CoreError {
    let raw = values.iter().map(f64::to_string).collect::<Vec<_>>().join(",");
    CoreError::InvalidSetting { key: key.to_owned(), value: raw, reason: reason.to_owned() }
}
