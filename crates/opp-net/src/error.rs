//! Connectivity-layer error type.

use thiserror::Error;

use opp_core::{ConnectionId, CoreError, InterfaceId};

/// Errors produced by `opp-net`.
///
/// `MissingPeerConnection` is the fatal consistency failure: a connection
/// must always be listed by both of its interfaces or by neither.
#[derive(Debug, Error)]
pub enum NetError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("connection {connection} not found in interface {interface}")]
    MissingPeerConnection {
        connection: ConnectionId,
        interface:  InterfaceId,
    },

    #[error("connection {0} not found")]
    UnknownConnection(ConnectionId),

    #[error("interface {0} not found")]
    UnknownInterface(InterfaceId),

    #[error("connection {0} already carries a transfer")]
    TransferInProgress(ConnectionId),

    #[error("cannot connect {a} to {b}: {reason}")]
    InvalidConnection {
        a:      InterfaceId,
        b:      InterfaceId,
        reason: &'static str,
    },
}

pub type NetResult<T> = Result<T, NetError>;
