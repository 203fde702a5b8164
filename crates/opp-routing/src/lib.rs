//! `opp-routing`: opportunistic routing over intermittent contacts.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`message`]   | `Message`, `ProtocolMeta`                                 |
//! | [`buffer`]    | `MessageBuffer` (receive-ordered, byte capacity)          |
//! | [`ack`]       | `AckSet`, `SentLedger`                                    |
//! | [`window`]    | `TransferWindow` bytes-per-contact average                |
//! | [`density`]   | `DensityTracker`, `ThrottleSignal`                        |
//! | [`policy`]    | `ReplicationPolicy` trait, `RouterKind`, the four variants|
//! | [`settings`]  | `RouterSettings`, `QueueMode`                             |
//! | [`router`]    | `Router` per-host engine, `ReceiveStatus`, `RouterStats`  |
//! | [`set`]       | `RouterSet`: contact exchange, scheduling, completion     |
//! | [`error`]     | `RoutingError`, `RoutingResult<T>`                        |
//!
//! # Feature flags
//!
//! | Flag      | Effect                                                    |
//! |-----------|-----------------------------------------------------------|
//! | `fx-hash` | FxHash id sets instead of SipHash.                        |
//! | `serde`   | Propagates serde derives to `opp-core` types.             |

pub mod ack;
pub mod buffer;
pub mod density;
pub mod error;
pub mod message;
pub mod policy;
pub mod router;
pub mod set;
pub mod settings;
pub mod window;

#[cfg(test)]
mod tests;

pub use ack::{AckSet, SentLedger};
pub use buffer::MessageBuffer;
pub use density::{DensityTracker, ThrottleSignal};
pub use error::{RoutingError, RoutingResult};
pub use message::{Message, ProtocolMeta};
pub use policy::{DensityAware, DirectDelivery, Epidemic, ReplicationPolicy, RouterKind, SprayAndWait};
pub use router::{ReceiveStatus, Router, RouterStats};
pub use set::RouterSet;
pub use settings::{QueueMode, RouterSettings};
pub use window::TransferWindow;
