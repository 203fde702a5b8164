//! Planar coordinates.
//!
//! Movement traces are converted to a flat metric plane before they reach
//! this crate, so distances are plain Euclidean metres.

/// A point on the simulation plane, in metres.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in metres.
    #[inline]
    pub fn distance(self, other: Coord) -> f64 {
        self.distance_2(other).sqrt()
    }

    /// Squared distance, the form the R-tree index works in.
    #[inline]
    pub fn distance_2(self, other: Coord) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn as_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}
