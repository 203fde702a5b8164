use opp_core::CoreError;
use opp_net::NetError;
use opp_routing::RoutingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error("{what} covers {got} hosts but the scenario has {expected}")]
    HostCountMismatch {
        expected: usize,
        got:      usize,
        what:     &'static str,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

pub type SimResult<T> = Result<T, SimError>;
