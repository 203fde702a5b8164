//! Routing-layer error type.

use thiserror::Error;

use opp_core::{CoreError, HostId, MessageId};
use opp_net::NetError;

use crate::policy::RouterKind;

/// Errors produced by `opp-routing`.
///
/// `RouterMismatch` and `MissingMetadata` mean hosts with incompatible
/// protocol configurations met; both abort the run.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error("router mismatch: {a} runs {a_kind} but {b} runs {b_kind}")]
    RouterMismatch {
        a:      HostId,
        a_kind: RouterKind,
        b:      HostId,
        b_kind: RouterKind,
    },

    #[error("message {message} at {host} has no copy-count metadata")]
    MissingMetadata { message: MessageId, host: HostId },

    #[error("no router for host {0}")]
    UnknownHost(HostId),

    #[error("router at index {index} belongs to {host}")]
    MisplacedRouter { index: usize, host: HostId },

    #[error("{0} cannot transfer to itself")]
    SelfTransfer(HostId),

    #[error("{host} finished receiving {message} but never accepted it")]
    UnknownIncoming { host: HostId, message: MessageId },

    #[error("unknown router type {0:?}")]
    UnknownRouter(String),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
