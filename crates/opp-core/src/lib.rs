//! `opp-core`: foundational types for the opportunistic-network simulator.
//!
//! This crate is a dependency of every other `opp-*` crate and has no `opp-*`
//! dependencies of its own.
//!
//! # What lives here
//!
//! | Module        | Contents                                               |
//! |---------------|--------------------------------------------------------|
//! | [`ids`]       | `HostId`, `InterfaceId`, `ConnectionId`, `MessageId`   |
//! | [`geo`]       | `Coord`, planar distance                               |
//! | [`time`]      | `Tick`, `SimClock`, `SimConfig`                        |
//! | [`rng`]       | `SimRng`, per-class child streams                      |
//! | [`settings`]  | `Settings`, `Scope`, `SettingRange`                    |
//! | [`error`]     | `CoreError`, `CoreResult`                              |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to the public value types.  |

pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod settings;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::Coord;
pub use ids::{ConnectionId, HostId, InterfaceId, MessageId};
pub use rng::SimRng;
pub use settings::{Scope, SettingRange, Settings};
pub use time::{SimClock, SimConfig, Tick, SECS_PER_DAY, hour_of_day};
