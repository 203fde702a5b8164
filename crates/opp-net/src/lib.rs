//! `opp-net`: radio interfaces, contact detection and connections.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                |
//! |-----------------|---------------------------------------------------------|
//! | [`interface`]   | `NetworkInterface`, `HostState`, `InterfaceRates`       |
//! | [`settings`]    | `InterfaceSettings` prototype and per-instance draws    |
//! | [`activeness`]  | `ActivenessSchedule`, `SyncSleep`                       |
//! | [`scan`]        | `ScanClock` scan-round detection                        |
//! | [`connection`]  | `Connection`, `Transfer`, `ConnectionEvent`, listeners  |
//! | [`discovery`]   | `RangeDiscovery` trait, `RTreeDiscovery`                |
//! | [`network`]     | `Network` arena and the per-tick contact update         |
//! | [`error`]       | `NetError`, `NetResult<T>`                              |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Propagates serde derives to `opp-core` types.                |

pub mod activeness;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod interface;
pub mod network;
pub mod scan;
pub mod settings;


pub use activeness::{ActivenessSchedule, SyncSleep};
pub use connection::{Connection, ConnectionChange, ConnectionEvent, ConnectionListener, Transfer};
pub use discovery::{RTreeDiscovery, RangeDiscovery};
pub use error::{NetError, NetResult};
pub use interface::{HostState, InterfaceRates, NetworkInterface};
pub use network::Network;
pub use scan::ScanClock;
pub use settings::InterfaceSettings;
