//! Integration tests for opp-sim.

use opp_core::{Coord, HostId, MessageId, SettingRange, SimConfig, Tick};
use opp_energy::EnergySettings;
use opp_net::{ConnectionChange, ConnectionEvent, InterfaceSettings};
use opp_routing::{Message, RouterKind, RouterSettings, ThrottleSignal};

use crate::{HostGroup, SimObserver};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn test_config(total_ticks: u64) -> SimConfig {
    SimConfig {
        tick_secs: 1.0,
        total_ticks,
        seed: 42,
        snapshot_interval_ticks: 0,
    }
}

/// Continuously scanning `bt` radios, 250 B/s, no energy costs.
fn radio(range: f64) -> InterfaceSettings {
    InterfaceSettings::fixed("bt", range, 250.0, 0.0)
}

fn group(id: &str, count: usize, kind: RouterKind, range: f64) -> HostGroup {
    HostGroup::new(id, count, RouterSettings::new(kind)).interface(radio(range))
}

fn energy(initial: f64, base: f64) -> EnergySettings {
    EnergySettings {
        initial: SettingRange::scalar(initial),
        base:    SettingRange::scalar(base),
        warmup:  0.0,
    }
}

#[derive(Default)]
struct Recorder {
    ticks:     u64,
    snapshots: u64,
    ended:     Option<Tick>,
    up:        usize,
    down:      Vec<ConnectionEvent>,
    delivered: Vec<(MessageId, f64)>,
    throttles: Vec<(HostId, ThrottleSignal)>,
}

impl SimObserver for Recorder {
    fn on_tick_end(&mut self, _tick: Tick, _connections: usize) {
        self.ticks += 1;
    }

    fn on_connection(&mut self, event: &ConnectionEvent) {
        match event.change {
            ConnectionChange::Up => self.up += 1,
            ConnectionChange::Down => self.down.push(event.clone()),
        }
    }

    fn on_message_delivered(&mut self, msg: &Message, now: f64) {
        self.delivered.push((msg.id, now));
    }

    fn on_throttle(&mut self, host: HostId, signal: ThrottleSignal) {
        self.throttles.push((host, signal));
    }

    fn on_snapshot(
        &mut self,
        _tick:    Tick,
        _hosts:   &[crate::Host],
        _net:     &opp_net::Network,
        _routers: &opp_routing::RouterSet,
    ) {
        self.snapshots += 1;
    }

    fn on_sim_end(&mut self, final_tick: Tick) {
        self.ended = Some(final_tick);
    }
}

// ── SimBuilder validation ─────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use opp_core::Settings;

    use super::*;
    use crate::{SimBuilder, SimError, StaticMovement};

    #[test]
    fn hosts_numbered_across_groups() {
        let sim = SimBuilder::new(test_config(10), StaticMovement::line(5, 100.0))
            .group(group("a", 2, RouterKind::EpidemicWithAck, 10.0))
            .group(group("b", 3, RouterKind::EpidemicWithAck, 10.0).interface(radio(5.0)))
            .build()
            .unwrap();
        assert_eq!(sim.hosts.len(), 5);
        assert_eq!(sim.routers.len(), 5);
        assert_eq!(sim.hosts[1].group, "a");
        assert_eq!(sim.hosts[2].group, "b");
        assert_eq!(sim.hosts[4].id, HostId(4));
        assert_eq!(sim.hosts[4].interfaces.len(), 2);
        assert_eq!(sim.net.interfaces().len(), 2 + 3 * 2);
        assert!(sim.hosts.iter().all(|h| h.energy.is_none() && h.has_energy()));
    }

    #[test]
    fn movement_count_mismatch_errors() {
        let result = SimBuilder::new(test_config(10), StaticMovement::line(2, 1.0))
            .group(group("a", 3, RouterKind::EpidemicWithAck, 10.0))
            .build();
        assert!(matches!(
            result,
            Err(SimError::HostCountMismatch { expected: 3, got: 2, .. })
        ));
    }

    #[test]
    fn empty_scenario_errors() {
        let result = SimBuilder::new(test_config(10), StaticMovement::default()).build();
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    fn scenario(extra: &[(&str, &str)]) -> Settings {
        let mut s = Settings::from_pairs([
            ("Scenario.endTime", "100"),
            ("Scenario.updateInterval", "0.5"),
            ("Scenario.nrofHostGroups", "2"),
            ("Group.router", "EpidemicWithAckRouter"),
            ("Group.interface1", "btInterface"),
            ("btInterface.transmitRange", "10"),
            ("btInterface.transmitSpeed", "250"),
            ("Group1.nrofHosts", "2"),
            ("Group2.nrofHosts", "1"),
            ("Group2.groupID", "c"),
            ("Group2.net.transmitRange", "50"),
            ("Energy.initialEnergy", "10,20"),
        ]);
        for &(k, v) in extra {
            s.set(k, v);
        }
        s
    }

    #[test]
    fn from_settings_reads_groups() {
        let settings = scenario(&[]);
        let sim = SimBuilder::from_settings(&settings, StaticMovement::line(3, 1.0))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(sim.config.total_ticks, 200);
        assert_eq!(sim.hosts[0].group, "Group1");
        assert_eq!(sim.hosts[2].group, "c");

        let ranges: Vec<f64> = sim.net.interfaces().iter().map(|i| i.range).collect();
        assert_eq!(ranges, vec![10.0, 10.0, 50.0]);
        assert!(sim.net.interfaces().iter().all(|i| i.kind == "btInterface"));
        for h in &sim.hosts {
            let e = h.current_energy().unwrap();
            assert!((10.0..20.0).contains(&e), "{e}");
        }
    }

    #[test]
    fn same_seed_same_draws() {
        let settings = scenario(&[]);
        let energies = || {
            let sim = SimBuilder::from_settings(&settings, StaticMovement::line(3, 1.0))
                .unwrap()
                .build()
                .unwrap();
            sim.hosts.iter().map(|h| h.current_energy()).collect::<Vec<_>>()
        };
        assert_eq!(energies(), energies());
    }

    #[test]
    fn rejects_bad_interface_settings() {
        let settings = scenario(&[("btInterface.syncIS", "100,50")]);
        assert!(SimBuilder::from_settings(&settings, StaticMovement::line(3, 1.0)).is_err());

        let settings = scenario(&[("btInterface.transmitRange", "-3")]);
        assert!(SimBuilder::from_settings(&settings, StaticMovement::line(3, 1.0)).is_err());

        let settings = scenario(&[("Group.router", "NoSuchRouter")]);
        assert!(matches!(
            SimBuilder::from_settings(&settings, StaticMovement::line(3, 1.0)),
            Err(SimError::Routing(_))
        ));
    }
}

// ── Run loop ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod run_tests {
    use super::*;
    use crate::{NoopObserver, SimBuilder, StaticMovement};

    #[test]
    fn runs_to_end_tick() {
        let mut config = test_config(10);
        config.snapshot_interval_ticks = 5;
        let mut sim = SimBuilder::new(config, StaticMovement::line(2, 100.0))
            .group(group("a", 2, RouterKind::EpidemicWithAck, 10.0))
            .build()
            .unwrap();
        let mut obs = Recorder::default();
        sim.run(&mut obs).unwrap();
        assert_eq!(obs.ticks, 10);
        assert_eq!(obs.snapshots, 2);
        assert_eq!(obs.ended, Some(Tick(10)));
        assert_eq!(sim.clock.current_tick, Tick(10));
        assert_eq!(obs.up, 0, "hosts out of range never meet");
    }

    #[test]
    fn run_ticks_ignores_end() {
        let mut sim = SimBuilder::new(test_config(2), StaticMovement::line(1, 0.0))
            .group(group("a", 1, RouterKind::EpidemicWithAck, 10.0))
            .build()
            .unwrap();
        sim.run_ticks(5, &mut NoopObserver).unwrap();
        assert_eq!(sim.clock.current_tick, Tick(5));
        assert_eq!(sim.now(), 5.0);
    }

    #[test]
    fn create_message_checks_hosts() {
        let mut sim = SimBuilder::new(test_config(2), StaticMovement::line(2, 0.0))
            .group(group("a", 2, RouterKind::EpidemicWithAck, 10.0))
            .build()
            .unwrap();
        assert_eq!(sim.create_message(HostId(0), HostId(1), 10).unwrap(), Some(MessageId(0)));
        assert_eq!(sim.create_message(HostId(1), HostId(0), 10).unwrap(), Some(MessageId(1)));
        assert!(sim.create_message(HostId(0), HostId(7), 10).is_err());
    }

    #[test]
    fn epidemic_relays_along_a_line() {
        // 0, 1, 2 in a line with 0 and 2 out of each other's range.
        let mut sim = SimBuilder::new(test_config(10), StaticMovement::line(3, 8.0))
            .group(group("a", 3, RouterKind::EpidemicWithAck, 10.0))
            .build()
            .unwrap();
        let id = sim.create_message(HostId(0), HostId(2), 250).unwrap().unwrap();
        let mut obs = Recorder::default();
        sim.run(&mut obs).unwrap();

        assert_eq!(obs.up, 2);
        assert_eq!(obs.delivered.len(), 1);
        assert_eq!(obs.delivered[0].0, id);
        assert!(sim.router(HostId(2)).unwrap().is_delivered(id));
        assert!(!sim.router(HostId(1)).unwrap().has_message(id), "relay acked on final hop");
        assert_eq!(sim.router(HostId(2)).unwrap().stats().delivered, 1);
    }

    #[test]
    fn direct_delivery_ack_reaches_bystander() {
        // A and B meet; B later meets C, who never held the message.
        let mut sim = SimBuilder::new(
            test_config(20),
            StaticMovement::new(vec![Coord::new(0.0, 0.0), Coord::new(5.0, 0.0), Coord::new(100.0, 0.0)]),
        )
        .group(group("a", 3, RouterKind::DirectDeliveryWithAck, 10.0))
        .build()
        .unwrap();
        let id = sim.create_message(HostId(0), HostId(1), 250).unwrap().unwrap();
        let mut obs = Recorder::default();
        sim.run_ticks(3, &mut obs).unwrap();
        assert_eq!(obs.delivered.len(), 1);
        assert!(sim.router(HostId(1)).unwrap().acks().contains(id));
        assert!(!sim.router(HostId(2)).unwrap().acks().contains(id));

        sim.movement.set_location(HostId(1), Coord::new(100.0, 0.0));
        sim.run_ticks(2, &mut obs).unwrap();
        assert_eq!(obs.down.len(), 1, "A-B link broke on range loss");
        let c = sim.router(HostId(2)).unwrap();
        assert!(c.acks().contains(id));
        assert!(!c.is_delivered(id));
        assert_eq!(c.stats().relayed, 0);
    }

    #[test]
    fn moving_apart_aborts_transfer() {
        let mut sim = SimBuilder::new(test_config(20), StaticMovement::line(2, 5.0))
            .group(group("a", 2, RouterKind::EpidemicWithAck, 10.0))
            .build()
            .unwrap();
        let id = sim.create_message(HostId(0), HostId(1), 1_000).unwrap().unwrap();
        let mut obs = Recorder::default();
        sim.run_ticks(2, &mut obs).unwrap();
        assert!(sim.net.host_busy(HostId(0)));

        sim.movement.set_location(HostId(1), Coord::new(50.0, 0.0));
        sim.run_ticks(5, &mut obs).unwrap();
        assert!(obs.delivered.is_empty());
        assert_eq!(obs.down.len(), 1);
        let aborted = obs.down[0].aborted.as_ref().map(|t| t.message);
        assert_eq!(aborted, Some(id));
        assert_eq!(obs.down[0].bytes_transferred, 250.0);
        assert_eq!(sim.router(HostId(0)).unwrap().stats().aborted, 1);
        assert!(sim.router(HostId(0)).unwrap().has_message(id));
        assert!(!sim.router(HostId(1)).unwrap().is_receiving(id));
    }

    #[test]
    fn mismatched_routers_abort_the_run() {
        let mut sim = SimBuilder::new(test_config(5), StaticMovement::line(2, 1.0))
            .group(group("a", 1, RouterKind::EpidemicWithAck, 10.0))
            .group(group("b", 1, RouterKind::SprayAndWait, 10.0))
            .build()
            .unwrap();
        let err = sim.run(&mut NoopObserver).unwrap_err();
        assert!(matches!(err, crate::SimError::Routing(opp_routing::RoutingError::RouterMismatch { .. })));
    }

    #[test]
    fn density_signal_reaches_observer() {
        let router = RouterSettings::new(RouterKind::DensityAware).with_copies(4, true);
        let mut sim = SimBuilder::new(test_config(40), StaticMovement::line(2, 50.0))
            .group(HostGroup::new("d", 2, router).interface(radio(10.0)))
            .build()
            .unwrap();
        let mut obs = Recorder::default();
        // Bring the hosts together and apart four times within a minute.
        for _ in 0..4 {
            sim.movement.set_location(HostId(1), Coord::new(5.0, 0.0));
            sim.run_ticks(2, &mut obs).unwrap();
            sim.movement.set_location(HostId(1), Coord::new(50.0, 0.0));
            sim.run_ticks(2, &mut obs).unwrap();
        }
        assert_eq!(obs.up, 4);
        assert_eq!(obs.throttles.len(), 1);
        assert_eq!(obs.throttles[0].1.contacts, 4);
    }
}

// ── Energy phase ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod energy_tests {
    use opp_energy::{EnergyBudget, EnergyCategory};
    use opp_net::{HostState, InterfaceRates, Network, NetworkInterface, RTreeDiscovery, ScanClock};

    use super::*;
    use crate::energy::energy_phase;
    use crate::{Host, NoopObserver, SimBuilder, StaticMovement};

    #[test]
    fn scan_billed_once_per_round() {
        let mut net = Network::new(5.0);
        let rates = InterfaceRates { scan: 5.0, ..InterfaceRates::default() };
        let iface = NetworkInterface::new(
            opp_core::InterfaceId::INVALID,
            HostId(0),
            "bt".to_owned(),
            10.0,
            250.0,
            rates,
            ScanClock::new(10.0, 0.0),
        );
        let id = net.insert(iface);
        let mut hosts = vec![Host::new(HostId(0), "a", Some(EnergyBudget::new(100.0, 0.0, 0.0)))];
        hosts[0].interfaces.push(id);
        let states = vec![HostState::new(Coord::new(0.0, 0.0))];
        let mut discovery = RTreeDiscovery::new();

        let mut levels = Vec::new();
        for t in [0.0, 5.0, 10.0, 15.0] {
            net.update(t, &states, &mut discovery).unwrap();
            energy_phase(&mut hosts, &mut net, &states, t).unwrap();
            levels.push(hosts[0].current_energy().unwrap());
        }
        assert_eq!(levels, vec![100.0, 100.0, 100.0, 92.5]);
        let usage = hosts[0].energy.as_ref().unwrap().usage();
        assert_eq!(usage.get(EnergyCategory::Scan), 7.5);
    }

    #[test]
    fn exhausted_host_drops_its_links() {
        let mut sim = SimBuilder::new(test_config(10), StaticMovement::line(2, 5.0))
            .group(group("a", 1, RouterKind::EpidemicWithAck, 10.0).energy(energy(2.0, 1.0)))
            .group(group("b", 1, RouterKind::EpidemicWithAck, 10.0))
            .build()
            .unwrap();
        let mut obs = Recorder::default();
        sim.run_ticks(2, &mut obs).unwrap();
        assert_eq!(sim.net.connection_count(), 1);

        sim.run_ticks(2, &mut obs).unwrap();
        let a = &sim.hosts[0];
        assert!(!a.has_energy());
        assert_eq!(a.energy.as_ref().and_then(|e| e.exhausted_at()), Some(2.0));
        assert_eq!(sim.net.connection_count(), 0);
        assert_eq!(obs.down.len(), 1);

        let state = HostState { has_energy: false, ..HostState::new(Coord::new(0.0, 0.0)) };
        assert!(!sim.net.interface(a.interfaces[0]).unwrap().is_active(&state, sim.now()));

        sim.run_ticks(3, &mut obs).unwrap();
        assert_eq!(obs.up, 1, "never reconnects");
    }

    #[test]
    fn transfer_bills_both_ends() {
        let mut iface = radio(10.0);
        iface.transmit_energy = SettingRange::scalar(2.0);
        iface.receive_energy = SettingRange::scalar(1.0);
        let group = HostGroup::new("a", 2, RouterSettings::new(RouterKind::DirectDeliveryWithAck))
            .interface(iface)
            .energy(energy(100.0, 0.0));
        let mut sim = SimBuilder::new(test_config(10), StaticMovement::line(2, 5.0))
            .group(group)
            .build()
            .unwrap();
        sim.create_message(HostId(0), HostId(1), 1_000).unwrap();
        let mut obs = Recorder::default();
        sim.run_ticks(5, &mut obs).unwrap();

        assert_eq!(obs.delivered.len(), 1);
        let usage = |h: usize| sim.hosts[h].energy.as_ref().unwrap().usage().clone();
        assert_eq!(usage(0).get(EnergyCategory::Transmit), 6.0);
        assert_eq!(usage(0).get(EnergyCategory::Receive), 0.0);
        assert_eq!(usage(1).get(EnergyCategory::Receive), 3.0);
        assert_eq!(usage(1).get(EnergyCategory::Transmit), 0.0);
        assert_eq!(sim.hosts[1].current_energy(), Some(97.0));
    }

    #[test]
    fn warmup_defers_all_costs() {
        let mut e = energy(10.0, 1.0);
        e.warmup = 100.0;
        let mut sim = SimBuilder::new(test_config(10), StaticMovement::line(1, 0.0))
            .group(group("a", 1, RouterKind::EpidemicWithAck, 10.0).energy(e))
            .build()
            .unwrap();
        sim.run(&mut NoopObserver).unwrap();
        assert_eq!(sim.hosts[0].current_energy(), Some(10.0));
    }

    #[test]
    fn parked_host_pays_nothing() {
        let mut iface = radio(10.0);
        iface.base_energy = SettingRange::scalar(1.0);
        iface.sleep_energy = SettingRange::scalar(1.0);
        let mut movement = StaticMovement::line(1, 0.0);
        movement.set_active(HostId(0), false);
        let group = HostGroup::new("a", 1, RouterSettings::new(RouterKind::EpidemicWithAck))
            .interface(iface)
            .energy(energy(100.0, 1.0));
        let mut sim = SimBuilder::new(test_config(20), movement).group(group).build().unwrap();

        sim.run_ticks(10, &mut NoopObserver).unwrap();
        assert_eq!(sim.hosts[0].current_energy(), Some(100.0));
        assert!(sim.hosts[0].has_energy());
        assert_eq!(sim.hosts[0].energy.as_ref().unwrap().usage().total(), 0.0);

        sim.movement.set_active(HostId(0), true);
        sim.run_ticks(3, &mut NoopObserver).unwrap();
        let usage = sim.hosts[0].energy.as_ref().unwrap().usage().clone();
        assert_eq!(usage.get(EnergyCategory::Base), 3.0);
        assert_eq!(usage.get(EnergyCategory::InterfaceBase), 3.0);
        assert_eq!(sim.hosts[0].current_energy(), Some(94.0));
    }
}

// ── Movement ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod movement_tests {
    use super::*;
    use crate::{MovementProvider, WaypointMovement};

    #[test]
    fn interpolates_between_waypoints() {
        let mut m = WaypointMovement::new(vec![
            vec![(10.0, Coord::new(0.0, 0.0)), (20.0, Coord::new(100.0, 0.0))],
            vec![],
        ]);
        assert_eq!(m.host_count(), 2);
        m.update(5.0);
        assert_eq!(m.location(HostId(0)), Coord::new(0.0, 0.0));
        m.update(15.0);
        assert_eq!(m.location(HostId(0)), Coord::new(50.0, 0.0));
        m.update(99.0);
        assert_eq!(m.location(HostId(0)), Coord::new(100.0, 0.0));
        assert_eq!(m.location(HostId(1)), Coord::default());
    }

    #[test]
    fn waypoints_are_sorted() {
        let mut m = WaypointMovement::new(vec![vec![
            (20.0, Coord::new(0.0, 20.0)),
            (0.0, Coord::new(0.0, 0.0)),
        ]]);
        m.update(10.0);
        assert_eq!(m.location(HostId(0)), Coord::new(0.0, 10.0));
    }
}
