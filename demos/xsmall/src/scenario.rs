//! Synthetic campus layout and the host paths through it.
//!
//! A 400 m × 300 m area with two residential blocks, a market square, a
//! campus and a bus station.  Walkers commute home → market → campus → home,
//! two shuttles loop station → market → campus, and one kiosk sits at each of
//! the market, the campus and the station.

use opp_core::Coord;

pub const WALKERS: usize = 6;
pub const SHUTTLES: usize = 2;
pub const KIOSKS: usize = 3;

pub const NORTH_HOMES: Coord = Coord { x: 50.0, y: 250.0 };
pub const SOUTH_HOMES: Coord = Coord { x: 60.0, y: 40.0 };
pub const MARKET: Coord = Coord { x: 200.0, y: 150.0 };
pub const CAMPUS: Coord = Coord { x: 350.0, y: 220.0 };
pub const STATION: Coord = Coord { x: 300.0, y: 40.0 };

/// Walking speed, m/s.
const WALK_SPEED: f64 = 1.2;
/// Shuttle speed, m/s.
const SHUTTLE_SPEED: f64 = 8.0;
/// Shuttle dwell at each stop, seconds.
const SHUTTLE_DWELL: f64 = 60.0;

type Path = Vec<(f64, Coord)>;

/// Paths for every host, in host-id order: walkers, shuttles, kiosks.
pub fn build_paths(end_time: f64) -> Vec<Path> {
    let mut paths = Vec::with_capacity(WALKERS + SHUTTLES + KIOSKS);
    for i in 0..WALKERS {
        paths.push(walker_path(i));
    }
    for i in 0..SHUTTLES {
        // Second shuttle runs half a loop behind the first.
        paths.push(shuttle_path(i as f64 * 300.0, end_time));
    }
    for at in [MARKET, CAMPUS, STATION] {
        paths.push(vec![(0.0, at)]);
    }
    paths
}

/// Walkers 0-2 live in the north block, 3-5 in the south block.  Departures
/// are staggered by a minute so that they spread out along the way.
fn walker_path(i: usize) -> Path {
    let home = if i < WALKERS / 2 { NORTH_HOMES } else { SOUTH_HOMES };
    let mut b = PathBuilder::start(home, 300.0 + 60.0 * i as f64);
    b.travel(MARKET, WALK_SPEED);
    b.stay(1_200.0);
    b.travel(CAMPUS, WALK_SPEED);
    b.stay(1_800.0 + 120.0 * i as f64);
    b.travel(home, WALK_SPEED);
    b.finish()
}

fn shuttle_path(offset: f64, end_time: f64) -> Path {
    let mut b = PathBuilder::start(STATION, offset);
    while b.time < end_time {
        for stop in [MARKET, CAMPUS, STATION] {
            b.travel(stop, SHUTTLE_SPEED);
            b.stay(SHUTTLE_DWELL);
        }
    }
    b.finish()
}

struct PathBuilder {
    path: Path,
    at:   Coord,
    time: f64,
}

impl PathBuilder {
    fn start(at: Coord, time: f64) -> Self {
        Self { path: vec![(0.0, at), (time, at)], at, time }
    }

    fn travel(&mut self, to: Coord, speed: f64) {
        self.time += self.at.distance(to) / speed;
        self.at = to;
        self.path.push((self.time, to));
    }

    fn stay(&mut self, secs: f64) {
        self.time += secs;
        self.path.push((self.time, self.at));
    }

    fn finish(self) -> Path {
        self.path
    }
}
