//! `opp-energy`: per-host energy budgets and usage accounting.
//!
//! | Module     | Contents                                        |
//! |------------|-------------------------------------------------|
//! | [`budget`] | `EnergySettings`, `EnergyBudget`                |
//! | [`usage`]  | `EnergyCategory`, `EnergyUsage`                 |
//!
//! The per-tick cost model (which interface state costs what) lives in
//! `opp-sim`, since it needs interface and connection state from `opp-net`.
//! This crate only owns the charge and its invariants.

pub mod budget;
pub mod usage;


pub use budget::{EnergyBudget, EnergySettings, WARMUP_FROM_REPORT};
pub use usage::{EnergyCategory, EnergyUsage};
