//! Deterministic RNG streams.
//!
//! # Determinism strategy
//!
//! One root `SimRng` is seeded from `SimConfig::seed`.  Each component class
//! that draws random values at construction (energy budgets, interfaces,
//! routers) gets its own child stream:
//!
//!   child_seed = root.next_u64() XOR (stream * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio.
//! Because the children are derived in a fixed order at setup, a given seed
//! reproduces every full-charge draw, jitter value and scan anchor, and
//! adding hosts to one class does not perturb the draws of another class.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Well-known child stream offsets.
pub mod stream {
    pub const ENERGY:    u64 = 1;
    pub const INTERFACE: u64 = 2;
    pub const ROUTER:    u64 = 3;
}

/// Seeded generator handle passed explicitly through construction.
///
/// The simulation never shares one across hosts at run time; it only hands
/// `&mut SimRng` to constructors.
#[derive(Clone, Debug)]
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive a child stream with a different seed offset.
    pub fn child(&mut self, offset: u64) -> SimRng {
        let child_seed: u64 = self.0.r#gen::<u64>() ^ offset.wrapping_mul(MIXING_CONSTANT);
        SimRng(SmallRng::seed_from_u64(child_seed))
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
    }

    /// Uniform draw in `[min, max)`.  Returns `min` when the interval is
    /// empty or degenerate instead of panicking like `gen_range` would.
    #[inline]
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        if max > min {
            min + self.0.r#gen::<f64>() * (max - min)
        } else {
            min
        }
    }

    /// Uniform integer in `[0, upper)`; `0` when `upper == 0`.
    #[inline]
    pub fn below(&mut self, upper: u64) -> u64 {
        if upper == 0 { 0 } else { self.0.gen_range(0..upper) }
    }

    /// Shuffle a mutable slice in-place (Fisher-Yates).
    #[inline]
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.0);
    }
}
