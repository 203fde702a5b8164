//! Host positions.
//!
//! Movement models and trace parsing live outside this workspace; the
//! simulator only asks a [`MovementProvider`] where each host is and whether
//! its movement is active.  Two in-memory providers cover tests and demos.

use opp_core::{Coord, HostId};

pub trait MovementProvider {
    /// Number of hosts this provider places.
    fn host_count(&self) -> usize;

    /// Move every host to its position at `now`.  Called once per tick before
    /// anything reads positions.
    fn update(&mut self, _now: f64) {}

    fn location(&self, host: HostId) -> Coord;

    /// Hosts with inactive movement have every interface inactive and pay
    /// no base energy.
    fn is_active(&self, _host: HostId) -> bool {
        true
    }
}

// ── StaticMovement ────────────────────────────────────────────────────────────

/// Fixed positions, editable between ticks.
#[derive(Clone, Debug, Default)]
pub struct StaticMovement {
    locations: Vec<Coord>,
    active:    Vec<bool>,
}

impl StaticMovement {
    pub fn new(locations: Vec<Coord>) -> Self {
        let active = vec![true; locations.len()];
        Self { locations, active }
    }

    /// `n` hosts on the x axis, `spacing` apart, starting at the origin.
    pub fn line(n: usize, spacing: f64) -> Self {
        Self::new((0..n).map(|i| Coord::new(i as f64 * spacing, 0.0)).collect())
    }

    pub fn set_location(&mut self, host: HostId, at: Coord) {
        if let Some(l) = self.locations.get_mut(host.index()) {
            *l = at;
        }
    }

    pub fn set_active(&mut self, host: HostId, active: bool) {
        if let Some(a) = self.active.get_mut(host.index()) {
            *a = active;
        }
    }
}

impl MovementProvider for StaticMovement {
    fn host_count(&self) -> usize {
        self.locations.len()
    }

    fn location(&self, host: HostId) -> Coord {
        self.locations.get(host.index()).copied().unwrap_or_default()
    }

    fn is_active(&self, host: HostId) -> bool {
        self.active.get(host.index()).copied().unwrap_or(false)
    }
}

// ── WaypointMovement ──────────────────────────────────────────────────────────

/// Piecewise-linear paths through timed waypoints.
///
/// A host sits at its first waypoint until that time, moves in a straight
/// line between consecutive waypoints, and stays at the last one afterwards.
/// A host with no waypoints sits at the origin.
#[derive(Clone, Debug, Default)]
pub struct WaypointMovement {
    paths:   Vec<Vec<(f64, Coord)>>,
    current: Vec<Coord>,
}

impl WaypointMovement {
    /// `paths[i]` is host `i`'s `(time, position)` list; it is sorted here.
    pub fn new(mut paths: Vec<Vec<(f64, Coord)>>) -> Self {
        for p in &mut paths {
            p.sort_by(|a, b| a.0.total_cmp(&b.0));
        }
        let current = paths.iter().map(|p| position_at(p, 0.0)).collect();
        Self { paths, current }
    }
}

impl MovementProvider for WaypointMovement {
    fn host_count(&self) -> usize {
        self.paths.len()
    }

    fn update(&mut self, now: f64) {
        for (slot, path) in self.current.iter_mut().zip(&self.paths) {
            *slot = position_at(path, now);
        }
    }

    fn location(&self, host: HostId) -> Coord {
        self.current.get(host.index()).copied().unwrap_or_default()
    }
}

fn position_at(path: &[(f64, Coord)], now: f64) -> Coord {
    let Some(&(t0, first)) = path.first() else { return Coord::default() };
    if now <= t0 {
        return first;
    }
    for w in path.windows(2) {
        let ((ta, a), (tb, b)) = (w[0], w[1]);
        if now <= tb {
            if tb <= ta {
                return b;
            }
            let f = (now - ta) / (tb - ta);
            return Coord::new(a.x + (b.x - a.x) * f, a.y + (b.y - a.y) * f);
        }
    }
    path[path.len() - 1].1
}
