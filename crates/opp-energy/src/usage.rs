//! Per-category energy usage ledger.

use std::fmt;

/// What a debit paid for.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnergyCategory {
    /// Host-level base consumption while movement is active.
    Base,
    /// Interface base consumption while awake.
    InterfaceBase,
    /// Interface consumption while asleep.
    Sleep,
    /// Device discovery.
    Scan,
    /// Sending data.
    Transmit,
    /// Receiving data (debited by the sender's update).
    Receive,
}

impl EnergyCategory {
    pub const ALL: [EnergyCategory; 6] = [
        EnergyCategory::Base,
        EnergyCategory::InterfaceBase,
        EnergyCategory::Sleep,
        EnergyCategory::Scan,
        EnergyCategory::Transmit,
        EnergyCategory::Receive,
    ];

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnergyCategory::Base          => "base",
            EnergyCategory::InterfaceBase => "iface_base",
            EnergyCategory::Sleep         => "sleep",
            EnergyCategory::Scan          => "scan",
            EnergyCategory::Transmit      => "transmit",
            EnergyCategory::Receive       => "receive",
        }
    }
}

impl fmt::Display for EnergyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cumulative energy actually removed from a budget, split by category.
///
/// Amounts are post-warmup and post-floor: a debit that hit an empty budget
/// records only what was left.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnergyUsage {
    used: [f64; 6],
}

impl EnergyUsage {
    #[inline]
    pub(crate) fn record(&mut self, category: EnergyCategory, amount: f64) {
        self.used[category.slot()] += amount;
    }

    #[inline]
    pub fn get(&self, category: EnergyCategory) -> f64 {
        self.used[category.slot()]
    }

    pub fn total(&self) -> f64 {
        self.used.iter().sum()
    }

    /// `(category, amount)` pairs in declaration order, for report rows.
    pub fn iter(&self) -> impl Iterator<Item = (EnergyCategory, f64)> + '_ {
        EnergyCategory::ALL.iter().map(|&c| (c, self.get(c)))
    }
}
