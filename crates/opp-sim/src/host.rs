//! Simulated hosts.

use opp_core::{HostId, InterfaceId};
use opp_energy::EnergyBudget;

/// One node of the network.
///
/// Interfaces live in the [`Network`](opp_net::Network) arena and the router
/// in the [`RouterSet`](opp_routing::RouterSet); a host only keeps their ids
/// plus the state no other component owns.
#[derive(Clone, Debug)]
pub struct Host {
    pub id:         HostId,
    /// `groupID` of the group the host was created from.
    pub group:      String,
    pub interfaces: Vec<InterfaceId>,
    /// `None` for hosts without an energy model; they never run out.
    pub energy:     Option<EnergyBudget>,
}

impl Host {
    pub fn new(id: HostId, group: impl Into<String>, energy: Option<EnergyBudget>) -> Self {
        Self { id, group: group.into(), interfaces: Vec::new(), energy }
    }

    #[inline]
    pub fn has_energy(&self) -> bool {
        self.energy.as_ref().is_none_or(EnergyBudget::has_energy)
    }

    /// Remaining charge, if the host has an energy model.
    pub fn current_energy(&self) -> Option<f64> {
        self.energy.as_ref().map(EnergyBudget::current)
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.group, self.id.index())
    }
}
