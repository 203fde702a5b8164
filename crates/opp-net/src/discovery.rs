//! Range discovery: which interfaces are geometrically close enough to talk.
//!
//! The contact model only needs a candidate set; the exact min-range test
//! happens in [`Network::update`](crate::Network::update).

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use opp_core::{Coord, InterfaceId};

/// Geometric neighbour lookup, rebuilt once per tick.
pub trait RangeDiscovery {
    /// Replace the index with `entries` (discoverable interfaces only).
    fn rebuild(&mut self, entries: Vec<(InterfaceId, Coord)>);

    /// Push every indexed interface within `range` metres of `at` into `out`.
    fn within(&self, at: Coord, range: f64, out: &mut Vec<InterfaceId>);
}

// ── R-tree entry ──────────────────────────────────────────────────────────────

#[derive(Clone)]
struct IfaceEntry {
    point: [f64; 2],
    id:    InterfaceId,
}

impl RTreeObject for IfaceEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for IfaceEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── RTreeDiscovery ────────────────────────────────────────────────────────────

/// R-tree backed discovery, bulk-loaded every tick.
#[derive(Default)]
pub struct RTreeDiscovery {
    tree: RTree<IfaceEntry>,
}

impl RTreeDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl RangeDiscovery for RTreeDiscovery {
    fn rebuild(&mut self, entries: Vec<(InterfaceId, Coord)>) {
        let entries = entries
            .into_iter()
            .map(|(id, at)| IfaceEntry { point: at.as_array(), id })
            .collect();
        self.tree = RTree::bulk_load(entries);
    }

    fn within(&self, at: Coord, range: f64, out: &mut Vec<InterfaceId>) {
        out.extend(
            self.tree
                .locate_within_distance(at.as_array(), range * range)
                .map(|e| e.id),
        );
    }
}
