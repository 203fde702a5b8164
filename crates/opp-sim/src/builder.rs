//! Fluent builder for constructing a [`Sim`].

use tracing::info;

use opp_core::rng::stream;
use opp_core::{HostId, SimConfig, SimRng, Settings};
use opp_energy::{EnergyBudget, EnergySettings};
use opp_net::{ConnectionListener, InterfaceSettings, Network, RTreeDiscovery, RangeDiscovery};
use opp_routing::{Router, RouterSet, RouterSettings};

use crate::movement::MovementProvider;
use crate::{Host, Sim, SimError, SimResult};

// ── HostGroup ─────────────────────────────────────────────────────────────────

/// Hosts sharing one interface, router and energy configuration.
#[derive(Clone, Debug)]
pub struct HostGroup {
    pub id:         String,
    pub count:      usize,
    pub interfaces: Vec<InterfaceSettings>,
    pub router:     RouterSettings,
    /// `None` gives the group's hosts no energy model.
    pub energy:     Option<EnergySettings>,
}

impl HostGroup {
    pub fn new(id: impl Into<String>, count: usize, router: RouterSettings) -> Self {
        Self { id: id.into(), count, interfaces: Vec::new(), router, energy: None }
    }

    pub fn interface(mut self, settings: InterfaceSettings) -> Self {
        self.interfaces.push(settings);
        self
    }

    pub fn energy(mut self, settings: EnergySettings) -> Self {
        self.energy = Some(settings);
        self
    }

    /// Read group `index` (1-based).
    ///
    /// Group keys come from `GroupN`, falling back to `Group`.  Each
    /// `interfaceK` names an interface namespace; `GroupN.net` overrides its
    /// keys for this group.  Energy keys come from `GroupN`, falling back to
    /// `Energy`; a group with no `initialEnergy` anywhere has no energy model.
    pub fn from_settings(settings: &Settings, index: usize) -> SimResult<Self> {
        let ns = format!("Group{index}");
        let scope = settings.scoped(&ns).with_fallback("Group");

        let id = scope.string_opt("groupID").unwrap_or_else(|| ns.clone());
        let count = scope.u64("nrofHosts")? as usize;
        let router = RouterSettings::from_settings(&scope)?;

        let mut interfaces = Vec::new();
        for k in 1..=scope.u64_or("nrofInterfaces", 1)? {
            let iface_ns = scope.string(&format!("interface{k}"))?;
            let iscope = settings.scoped(&format!("{ns}.net")).with_fallback(&iface_ns);
            interfaces.push(InterfaceSettings::from_settings(&iscope, &iface_ns)?);
        }

        let escope = settings.scoped(&ns).with_fallback("Energy");
        let energy = if escope.contains("initialEnergy") {
            Some(EnergySettings::from_settings(&escope)?)
        } else {
            None
        };

        Ok(Self { id, count, interfaces, router, energy })
    }
}

// ── SimBuilder ────────────────────────────────────────────────────────────────

/// Fluent builder for [`Sim<M, D>`].
///
/// # Required inputs
///
/// - [`SimConfig`]: tick length, total ticks, seed, snapshot interval
/// - `M: MovementProvider`: positions for every host, in host-id order
///
/// # Optional inputs (have defaults)
///
/// | Method            | Default                 |
/// |-------------------|-------------------------|
/// | `.group(g)`       | no hosts (build fails)  |
/// | `.discovery(d)`   | `RTreeDiscovery::new()` |
/// | `.listener(l)`    | none                    |
///
/// Hosts are numbered consecutively across groups in the order the groups
/// were added.
///
/// # Example
///
/// ```rust,ignore
/// let settings = Settings::load_csv(path)?;
/// let mut sim = SimBuilder::from_settings(&settings, StaticMovement::line(6, 30.0))?
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder<M: MovementProvider, D: RangeDiscovery = RTreeDiscovery> {
    config:    SimConfig,
    movement:  M,
    discovery: D,
    groups:    Vec<HostGroup>,
    listeners: Vec<Box<dyn ConnectionListener>>,
}

impl<M: MovementProvider> SimBuilder<M, RTreeDiscovery> {
    pub fn new(config: SimConfig, movement: M) -> Self {
        Self {
            config,
            movement,
            discovery: RTreeDiscovery::new(),
            groups:    Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Read `Scenario.*` and every `GroupN` up to `Scenario.nrofHostGroups`.
    pub fn from_settings(settings: &Settings, movement: M) -> SimResult<Self> {
        let config = SimConfig::from_settings(settings)?;
        let groups = settings.scoped("Scenario").u64_or("nrofHostGroups", 1)? as usize;
        let mut builder = Self::new(config, movement);
        for g in 1..=groups {
            builder = builder.group(HostGroup::from_settings(settings, g)?);
        }
        Ok(builder)
    }
}

impl<M: MovementProvider, D: RangeDiscovery> SimBuilder<M, D> {
    pub fn group(mut self, group: HostGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Replace the range-discovery index.
    pub fn discovery<D2: RangeDiscovery>(self, discovery: D2) -> SimBuilder<M, D2> {
        SimBuilder {
            config: self.config,
            movement: self.movement,
            discovery,
            groups: self.groups,
            listeners: self.listeners,
        }
    }

    /// Subscribe a listener to every connection change.
    pub fn listener(mut self, listener: impl ConnectionListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn host_count(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }

    /// Validate inputs, instantiate hosts, interfaces and routers, and return
    /// a ready-to-run [`Sim`].
    ///
    /// Draw order: one child stream each for energy, interfaces and routers
    /// from the root seed; then per host, in id order, the energy budget,
    /// its interfaces and its router's stream.
    pub fn build(self) -> SimResult<Sim<M, D>> {
        if !(self.config.tick_secs > 0.0) {
            return Err(SimError::Config(format!(
                "tick length must be positive, got {}",
                self.config.tick_secs
            )));
        }
        let host_count = self.host_count();
        if host_count == 0 {
            return Err(SimError::Config("scenario has no hosts".to_owned()));
        }
        if self.movement.host_count() != host_count {
            return Err(SimError::HostCountMismatch {
                expected: host_count,
                got:      self.movement.host_count(),
                what:     "movement provider",
            });
        }

        let mut root = SimRng::new(self.config.seed);
        let mut energy_rng = root.child(stream::ENERGY);
        let mut iface_rng = root.child(stream::INTERFACE);
        let mut router_rng = root.child(stream::ROUTER);

        let mut net = Network::new(self.config.tick_secs);
        for l in self.listeners {
            net.add_listener(l);
        }

        let mut hosts = Vec::with_capacity(host_count);
        let mut routers = Vec::with_capacity(host_count);
        for group in &self.groups {
            for _ in 0..group.count {
                let id = HostId(hosts.len() as u32);
                let energy = group.energy.as_ref().map(|e| EnergyBudget::spawn(e, &mut energy_rng));
                let mut host = Host::new(id, group.id.clone(), energy);
                for proto in &group.interfaces {
                    host.interfaces.push(net.add_interface(proto, id, &mut iface_rng));
                }
                routers.push(Router::new(id, &group.router, router_rng.child(u64::from(id.0))));
                hosts.push(host);
            }
        }

        info!(
            hosts = hosts.len(),
            groups = self.groups.len(),
            interfaces = net.interfaces().len(),
            ticks = self.config.total_ticks,
            seed = self.config.seed,
            "simulation built"
        );

        Ok(Sim::new(
            self.config,
            hosts,
            net,
            RouterSet::from_routers(routers)?,
            self.movement,
            self.discovery,
        ))
    }
}
