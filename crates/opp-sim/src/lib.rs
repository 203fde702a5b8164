//! `opp-sim`: tick loop orchestrator for the opportunistic-network simulator.
//!
//! # Tick loop
//!
//! ```text
//! for tick in 0..config.total_ticks:
//!   ① Snapshot  : positions and movement flags from the MovementProvider,
//!                 energy flags from each host's budget.
//!   ② Contact   : Network::update; every ConnectionEvent goes to the
//!                 RouterSet (ack exchange, density counting, abort
//!                 bookkeeping) and then to the observer.
//!   ③ Routing   : advance in-flight transfers; per host in id order,
//!                 finish sends, drop expired messages, schedule.
//!   ④ Energy    : base, interface, scan, transmit/receive and sleep costs.
//! ```
//!
//! # Cargo features
//!
//! | Feature   | Effect                                                  |
//! |-----------|---------------------------------------------------------|
//! | `fx-hash` | FxHash id sets in the routers.                          |
//! | `serde`   | Serde derives on core value types and the energy ledger.|
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use opp_core::Settings;
//! use opp_sim::{NoopObserver, SimBuilder, StaticMovement};
//!
//! let settings = Settings::load_csv("scenario.csv".as_ref())?;
//! let mut sim = SimBuilder::from_settings(&settings, StaticMovement::line(10, 25.0))?
//!     .build()?;
//! sim.create_message(HostId(0), HostId(9), 1_000)?;
//! sim.run(&mut NoopObserver)?;
//! ```

pub mod builder;
mod energy;
pub mod error;
pub mod host;
pub mod movement;
pub mod observer;
pub mod sim;

#[cfg(test)]
mod tests;

pub use builder::{HostGroup, SimBuilder};
pub use error::{SimError, SimResult};
pub use host::Host;
pub use movement::{MovementProvider, StaticMovement, WaypointMovement};
pub use observer::{NoopObserver, SimObserver};
pub use sim::Sim;
