//! Unit tests for opp-routing.
//!
//! Scenario tests wire links by hand with `Network::connect` and step the
//! routing phase the way the simulator does: connection events, then one
//! second of transfer progress, then every host in id order.

#[cfg(test)]
mod helpers {
    use opp_core::{Coord, HostId, InterfaceId, MessageId, SimRng};
    use opp_net::{HostState, InterfaceSettings, Network};

    use crate::{Message, Router, RouterKind, RouterSet, RouterSettings};

    pub const SPEED: f64 = 250.0;

    pub fn msg(id: u32, from: u32, to: u32, size: u64) -> Message {
        Message::new(MessageId(id), HostId(from), HostId(to), size, 0.0)
    }

    pub fn router(host: u32, settings: &RouterSettings) -> Router {
        Router::new(HostId(host), settings, SimRng::new(u64::from(host)))
    }

    pub struct World {
        pub net:    Network,
        pub set:    RouterSet,
        pub hosts:  Vec<HostState>,
        pub ifaces: Vec<InterfaceId>,
        pub now:    f64,
    }

    impl World {
        pub fn new(settings: &[RouterSettings]) -> Self {
            let mut net = Network::new(1.0);
            let mut rng = SimRng::new(7);
            let proto = InterfaceSettings::fixed("bt", 10.0, SPEED, 1.0);
            let mut ifaces = Vec::new();
            let mut routers = Vec::new();
            for (i, s) in settings.iter().enumerate() {
                ifaces.push(net.add_interface(&proto, HostId(i as u32), &mut rng));
                routers.push(router(i as u32, s));
            }
            let hosts = vec![HostState::new(Coord::new(0.0, 0.0)); settings.len()];
            let set = RouterSet::from_routers(routers).unwrap();
            Self { net, set, hosts, ifaces, now: 0.0 }
        }

        pub fn uniform(kind: RouterKind, n: usize) -> Self {
            Self::new(&vec![RouterSettings::new(kind); n])
        }

        pub fn connect(&mut self, a: u32, b: u32) -> opp_core::ConnectionId {
            let (ia, ib) = (self.ifaces[a as usize], self.ifaces[b as usize]);
            self.net.connect(ia, ib, self.now, &self.hosts).unwrap()
        }

        pub fn create(&mut self, m: Message) {
            assert!(self.set.create_message(m, self.now).unwrap());
        }

        /// One routing tick.  Returns the messages delivered during it.
        pub fn step(&mut self) -> Vec<Message> {
            self.now += 1.0;
            for ev in self.net.drain_events() {
                self.set.on_connection_event(&ev).unwrap();
            }
            self.net.advance_transfers(1.0);
            let mut delivered = Vec::new();
            for h in 0..self.set.len() {
                let out = self
                    .set
                    .update_host(HostId(h as u32), self.now, &mut self.net, &self.hosts)
                    .unwrap();
                delivered.extend(out);
            }
            delivered
        }

        pub fn router(&self, host: u32) -> &Router {
            self.set.get(HostId(host)).unwrap()
        }
    }
}

// ── Ack set / ledger ──────────────────────────────────────────────────────────

#[cfg(test)]
mod ack {
    use opp_core::{HostId, MessageId};

    use crate::{AckSet, SentLedger};

    fn set(ids: &[u32]) -> AckSet {
        let mut s = AckSet::new();
        for &i in ids {
            s.insert(MessageId(i));
        }
        s
    }

    #[test]
    fn union_is_commutative_and_idempotent() {
        let (a, b) = (set(&[1, 2]), set(&[2, 3]));

        let mut ab = a.clone();
        assert_eq!(ab.union(&b), 1);
        let mut ba = b.clone();
        assert_eq!(ba.union(&a), 1);
        assert_eq!(ab, ba);

        assert_eq!(ab.union(&b), 0, "second union adds nothing");
        assert_eq!(ab.len(), 3);
    }

    #[test]
    fn ledger_tracks_pairs() {
        let mut l = SentLedger::new();
        assert!(l.record(HostId(1), MessageId(5)));
        assert!(!l.record(HostId(1), MessageId(5)));
        assert!(l.record(HostId(2), MessageId(5)));
        assert!(l.was_sent(HostId(2), MessageId(5)));
        assert!(!l.was_sent(HostId(3), MessageId(5)));
        assert_eq!(l.destinations(), 2);
        assert_eq!(l.len(), 2);
    }
}

// ── Buffer ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod buffer {
    use opp_core::MessageId;

    use super::helpers::msg;
    use crate::MessageBuffer;

    fn full_buffer() -> MessageBuffer {
        let mut b = MessageBuffer::new(Some(300));
        for i in 0..3 {
            b.insert(msg(i, 0, 1, 100), f64::from(i));
        }
        b
    }

    #[test]
    fn evicts_oldest_not_sending() {
        let mut b = full_buffer();
        let evicted = b.make_room(150, |id| id == MessageId(0)).unwrap();
        let ids: Vec<_> = evicted.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![MessageId(1), MessageId(2)]);
        assert_eq!(b.ids(), vec![MessageId(0)]);
        assert_eq!(b.free(), Some(200));
    }

    #[test]
    fn infeasible_room_evicts_nothing() {
        let mut b = full_buffer();
        assert!(b.make_room(400, |_| false).is_none());
        assert!(b.make_room(50, |_| true).is_none());
        assert_eq!(b.len(), 3);
        assert_eq!(b.used(), 300);
    }

    #[test]
    fn unbounded_always_fits() {
        let mut b = MessageBuffer::new(None);
        b.insert(msg(0, 0, 1, 1 << 40), 0.0);
        assert_eq!(b.make_room(u64::MAX, |_| false).map(|v| v.len()), Some(0));
        assert_eq!(b.free(), None);
    }

    #[test]
    fn reinsert_moves_to_back() {
        let mut b = full_buffer();
        b.insert(msg(0, 0, 1, 100), 10.0);
        assert_eq!(b.ids(), vec![MessageId(1), MessageId(2), MessageId(0)]);
        assert_eq!(b.used(), 300);
        assert_eq!(b.received_at(MessageId(0)), Some(10.0));
    }
}

// ── Transfer window / density ─────────────────────────────────────────────────

#[cfg(test)]
mod counters {
    use crate::{DensityAware, DensityTracker, ReplicationPolicy, SprayAndWait, TransferWindow};

    #[test]
    fn window_ignores_empty_contacts() {
        let mut w = TransferWindow::new();
        assert_eq!(w.push(100), 100);
        assert_eq!(w.push(0), 100);
        assert_eq!(w.push(300), 200);
        for _ in 0..10 {
            w.push(0);
        }
        assert_eq!(w.average(), 0, "old samples roll out");
    }

    #[test]
    fn density_signals_on_crossing_only() {
        let mut d = DensityTracker::new(3.0, 60.0);
        assert!(d.record_contact(10.0).is_none());
        assert!(d.record_contact(20.0).is_none());
        assert!(d.record_contact(30.0).is_none());
        let s = d.record_contact(40.0).unwrap();
        assert_eq!((s.at, s.contacts), (40.0, 4));
        assert!(d.record_contact(50.0).is_none(), "already above the limit");
        assert_eq!(d.contacts(), 5);
    }

    #[test]
    fn density_resets_after_quiet_gap() {
        let mut d = DensityTracker::new(3.0, 60.0);
        for t in [10.0, 20.0, 30.0, 40.0] {
            d.record_contact(t);
        }
        assert!(d.record_contact(200.0).is_none());
        assert_eq!(d.contacts(), 1);
        assert_eq!(d.last_contact(), 200.0);
        for t in [210.0, 220.0] {
            assert!(d.record_contact(t).is_none());
        }
        assert!(d.record_contact(230.0).is_some());
        assert_eq!(d.signals().len(), 2);
    }

    #[test]
    fn replayed_contacts_cross_at_the_same_times() {
        let contacts = [
            0.0, 10.0, 20.0, 30.0, 40.0, 200.0, 210.0, 220.0, 230.0, 300.0, 320.0, 340.0, 355.0,
            415.0, 500.0,
        ];
        let replay = || {
            let mut p = DensityAware::new(SprayAndWait::new(4, true), 3.0, 60.0);
            for &t in &contacts {
                p.on_contact(t);
            }
            p.throttle_signals().to_vec()
        };
        let first = replay();
        assert_eq!(first, replay());
        let at: Vec<f64> = first.iter().map(|s| s.at).collect();
        assert_eq!(at, vec![30.0, 230.0, 355.0]);
        assert!(first.iter().all(|s| s.contacts == 4));
    }

    #[test]
    fn gap_equal_to_limit_still_counts() {
        let mut d = DensityTracker::new(3.0, 60.0);
        d.record_contact(60.0);
        d.record_contact(120.0);
        assert_eq!(d.contacts(), 2);
    }
}

// ── Policies ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod policy {
    use opp_core::HostId;

    use super::helpers::msg;
    use crate::{ProtocolMeta, ReplicationPolicy, RouterKind, RoutingError, SprayAndWait};

    #[test]
    fn standard_split() {
        let p = SprayAndWait::new(6, false);
        assert_eq!((p.sender_share(6), p.receiver_share(6)), (5, 1));
        assert_eq!((p.sender_share(2), p.receiver_share(2)), (1, 1));
    }

    #[test]
    fn binary_split() {
        let p = SprayAndWait::new(6, true);
        assert_eq!((p.sender_share(6), p.receiver_share(6)), (3, 3));
        assert_eq!((p.sender_share(5), p.receiver_share(5)), (2, 3));
        assert_eq!((p.sender_share(2), p.receiver_share(2)), (1, 1));
    }

    #[test]
    fn single_copies_are_not_relayed() {
        let p = SprayAndWait::new(4, false);
        let mut a = msg(0, 0, 9, 10);
        a.meta = p.initial_meta();
        let mut b = msg(1, 0, 9, 10);
        b.set_copies(1);
        let picked = p.on_tick(HostId(0), &[&a, &b]).unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, a.id);
    }

    #[test]
    fn missing_copy_count_is_an_error() {
        let p = SprayAndWait::new(4, false);
        let m = msg(0, 0, 9, 10);
        assert_eq!(m.meta, ProtocolMeta::None);
        let err = p.on_tick(HostId(3), &[&m]).unwrap_err();
        assert!(matches!(err, RoutingError::MissingMetadata { host: HostId(3), .. }));
    }

    #[test]
    fn kind_names_round_trip() {
        for k in [
            RouterKind::EpidemicWithAck,
            RouterKind::DirectDeliveryWithAck,
            RouterKind::SprayAndWait,
            RouterKind::DensityAware,
        ] {
            assert_eq!(k.as_str().parse::<RouterKind>().unwrap(), k);
        }
        assert!("ProphetRouter".parse::<RouterKind>().is_err());
    }
}

// ── Receive decisions ─────────────────────────────────────────────────────────

#[cfg(test)]
mod receive {
    use opp_core::MessageId;

    use super::helpers::{msg, router};
    use crate::{AckSet, ReceiveStatus, RouterKind, RouterSettings};

    fn epidemic(buffer: Option<u64>, ttl: Option<f64>) -> RouterSettings {
        let mut s = RouterSettings::new(RouterKind::EpidemicWithAck);
        s.buffer_size = buffer;
        s.msg_ttl = ttl;
        s
    }

    #[test]
    fn busy_and_low_energy() {
        let mut r = router(1, &epidemic(None, None));
        let m = msg(0, 0, 2, 10);
        assert_eq!(r.check_receiving(&m, 0.0, true, true), ReceiveStatus::TryLaterBusy);
        assert_eq!(r.check_receiving(&m, 0.0, false, false), ReceiveStatus::DeniedLowResources);
        assert_eq!(r.check_receiving(&m, 0.0, false, true), ReceiveStatus::Ok);
    }

    #[test]
    fn already_seen_is_old() {
        let mut r = router(1, &epidemic(None, None));
        assert!(r.create_message(msg(0, 1, 2, 10), 0.0));
        assert_eq!(r.check_receiving(&msg(0, 0, 2, 10), 0.0, false, true), ReceiveStatus::DeniedOld);

        let mut acks = AckSet::new();
        acks.insert(MessageId(7));
        r.union_acks(&acks);
        assert_eq!(r.check_receiving(&msg(7, 0, 2, 10), 0.0, false, true), ReceiveStatus::DeniedOld);
    }

    #[test]
    fn expired_only_denied_for_relays() {
        let mut r = router(1, &epidemic(None, None));
        let mut m = msg(0, 0, 2, 10);
        m.ttl = Some(1.0);
        assert_eq!(r.check_receiving(&m, 120.0, false, true), ReceiveStatus::DeniedTtl);
        m.to = opp_core::HostId(1);
        assert_eq!(r.check_receiving(&m, 120.0, false, true), ReceiveStatus::Ok);
    }

    #[test]
    fn no_space() {
        let mut r = router(1, &epidemic(Some(100), None));
        assert_eq!(r.check_receiving(&msg(0, 0, 2, 150), 0.0, false, true), ReceiveStatus::DeniedNoSpace);
        assert_eq!(
            r.check_receiving(&msg(1, 0, 1, 150), 0.0, false, true),
            ReceiveStatus::Ok,
            "final recipients do not buffer"
        );
    }

    #[test]
    fn ttl_drop_keeps_live_messages() {
        let mut r = router(0, &epidemic(None, Some(2.0)));
        assert!(r.create_message(msg(0, 0, 1, 10), 0.0));
        let mut later = msg(1, 0, 1, 10);
        later.created = 100.0;
        assert!(r.create_message(later, 100.0));
        assert_eq!(r.drop_expired(130.0), 1);
        assert!(r.has_message(MessageId(1)));
        assert_eq!(r.stats().dropped, 1);
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod settings {
    use opp_core::Settings;

    use crate::{QueueMode, RouterKind, RouterSettings, RoutingError};

    fn parse(pairs: &[(&str, &str)]) -> Result<RouterSettings, RoutingError> {
        let s = Settings::from_pairs(pairs.iter().copied());
        RouterSettings::from_settings(&s.scoped("Group1"))
    }

    #[test]
    fn spray_keys_come_from_router_namespace() {
        let r = parse(&[
            ("Group1.router", "SprayAndWaitRouter"),
            ("Group1.bufferSize", "5000"),
            ("Group1.msgTtl", "300"),
            ("Group1.sendQueue", "1"),
            ("SprayAndWaitRouter.nrofCopies", "6"),
            ("SprayAndWaitRouter.binaryMode", "true"),
        ])
        .unwrap();
        assert_eq!(r.kind, RouterKind::SprayAndWait);
        assert_eq!(r.buffer_size, Some(5000));
        assert_eq!(r.msg_ttl, Some(300.0));
        assert_eq!(r.queue_mode, QueueMode::Random);
        assert_eq!((r.copies, r.binary), (6, true));
    }

    #[test]
    fn defaults() {
        let r = parse(&[("Group1.router", "EpidemicWithAckRouter")]).unwrap();
        assert_eq!(r, RouterSettings::new(RouterKind::EpidemicWithAck));

        let d = parse(&[("Group1.router", "DensityAwareRouter"), ("DensityAwareRouter.nrofCopies", "3")])
            .unwrap();
        assert_eq!((d.density_limit, d.time_limit, d.binary), (3.0, 60.0, false));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse(&[("Group1.router", "SprayAndWaitRouter")]).is_err(), "nrofCopies required");
        assert!(
            parse(&[("Group1.router", "SprayAndWaitRouter"), ("SprayAndWaitRouter.nrofCopies", "0")])
                .is_err()
        );
        assert!(matches!(
            parse(&[("Group1.router", "FloodRouter")]),
            Err(RoutingError::UnknownRouter(_))
        ));
        assert!(parse(&[("Group1.router", "EpidemicWithAckRouter"), ("Group1.sendQueue", "3")]).is_err());
    }
}

// ── Router set scenarios ──────────────────────────────────────────────────────

#[cfg(test)]
mod scenario {
    use opp_core::{HostId, MessageId};

    use super::helpers::{msg, router, World};
    use crate::{ProtocolMeta, RouterKind, RouterSet, RouterSettings, RoutingError};

    const M: MessageId = MessageId(0);

    #[test]
    fn misplaced_routers_are_rejected() {
        let s = RouterSettings::new(RouterKind::EpidemicWithAck);
        let err = RouterSet::from_routers(vec![router(0, &s), router(2, &s)]).unwrap_err();
        assert!(matches!(err, RoutingError::MisplacedRouter { index: 1, host: HostId(2) }));
    }

    #[test]
    fn epidemic_acks_propagate_back() {
        let mut w = World::uniform(RouterKind::EpidemicWithAck, 3);
        w.create(msg(0, 0, 2, 100));
        w.connect(0, 1);
        w.step();
        w.step();
        assert!(w.router(1).has_message(M), "relayed to the carrier");
        assert_eq!(w.router(1).message(M).map(|m| m.hop_count), Some(1));

        w.connect(1, 2);
        w.step();
        let delivered = w.step();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].hop_count, 2);
        assert!(w.router(2).is_delivered(M));
        assert!(!w.router(1).has_message(M), "carrier drops after final hop");
        assert!(w.router(1).acks().contains(M));
        assert!(w.router(0).has_message(M));

        w.connect(0, 2);
        w.step();
        assert!(w.router(0).acks().contains(M));
        assert!(!w.router(0).has_message(M));
        assert_eq!(w.router(0).stats().removed_by_ack, 1);
    }

    #[test]
    fn direct_delivery_never_relays() {
        let mut w = World::uniform(RouterKind::DirectDeliveryWithAck, 3);
        w.create(msg(0, 0, 1, 100));
        w.connect(0, 2);
        for _ in 0..3 {
            assert!(w.step().is_empty());
        }
        assert!(w.router(2).buffer().is_empty());

        w.connect(0, 1);
        w.step();
        let delivered = w.step();
        assert_eq!(delivered.len(), 1);
        assert!(w.router(0).buffer().is_empty());
        assert!(w.router(0).sent().was_sent(HostId(1), M));
    }

    #[test]
    fn peer_hands_over_messages_for_us() {
        let mut w = World::uniform(RouterKind::DirectDeliveryWithAck, 2);
        w.create(msg(0, 1, 0, 100));
        w.create(msg(1, 0, 5, 100));
        w.connect(0, 1);
        w.step();
        assert!(w.net.host_busy(HostId(0)), "host 0 asked host 1");
        assert!(w.router(1).is_sending(M));
        assert_eq!(w.step().len(), 1);
        assert!(w.router(0).is_delivered(M));
    }

    #[test]
    fn denied_old_at_destination_drops_sender_copy() {
        let mut w = World::uniform(RouterKind::DirectDeliveryWithAck, 2);
        w.create(msg(0, 0, 1, 100));
        let mut acks = crate::AckSet::new();
        acks.insert(M);
        w.set.get_mut(HostId(1)).unwrap().union_acks(&acks);

        w.connect(0, 1);
        w.net.drain_events();
        w.step();
        assert!(!w.router(0).has_message(M));
        assert!(w.router(0).acks().contains(M));
        assert!(!w.net.host_busy(HostId(0)));
    }

    #[test]
    fn spray_binary_halves_copies() {
        let s = RouterSettings::new(RouterKind::SprayAndWait).with_copies(4, true);
        let mut w = World::new(&[s.clone(), s.clone(), s]);
        w.create(msg(0, 0, 2, 100));
        w.connect(0, 1);
        w.step();
        w.step();
        assert_eq!(w.router(0).message(M).and_then(|m| m.copies()), Some(2));
        assert_eq!(w.router(1).message(M).map(|m| m.meta), Some(ProtocolMeta::SprayAndWait { copies: 2 }));
    }

    #[test]
    fn spray_standard_waits_at_one_copy() {
        let s = RouterSettings::new(RouterKind::SprayAndWait).with_copies(2, false);
        let mut w = World::new(&[s.clone(), s.clone(), s]);
        w.create(msg(0, 0, 9, 100));
        w.connect(0, 1);
        w.step();
        w.step();
        assert_eq!(w.router(0).message(M).and_then(|m| m.copies()), Some(1));
        assert_eq!(w.router(1).message(M).and_then(|m| m.copies()), Some(1));

        w.connect(1, 2);
        w.connect(0, 2);
        for _ in 0..3 {
            w.step();
        }
        assert!(w.router(2).buffer().is_empty(), "one-copy holders only deliver");
    }

    #[test]
    fn disconnect_aborts_transfer() {
        let mut w = World::uniform(RouterKind::EpidemicWithAck, 2);
        w.create(msg(0, 0, 9, 1000));
        let c = w.connect(0, 1);
        w.step();
        assert!(w.router(1).is_receiving(M));
        w.step();

        w.net.disconnect(c, w.now).unwrap();
        w.step();
        assert!(!w.router(1).is_receiving(M));
        assert!(!w.router(1).has_message(M), "partial copy never lands");
        assert!(!w.router(0).is_sending(M));
        assert!(w.router(0).has_message(M));
        assert_eq!(w.router(0).stats().aborted, 1);
        assert_eq!(w.router(0).avg_transferred_bytes(), 250);
    }

    #[test]
    fn mixed_variants_abort() {
        let mut w = World::new(&[
            RouterSettings::new(RouterKind::EpidemicWithAck),
            RouterSettings::new(RouterKind::DirectDeliveryWithAck),
        ]);
        w.connect(0, 1);
        let ev = w.net.drain_events().remove(0);
        let err = w.set.on_connection_event(&ev).unwrap_err();
        assert!(matches!(err, RoutingError::RouterMismatch { a: HostId(0), b: HostId(1), .. }));
    }

    #[test]
    fn density_counted_by_initiator_only() {
        let s = RouterSettings::new(RouterKind::DensityAware).with_copies(2, false);
        let mut w = World::new(&[s.clone(), s]);
        let mut signal = None;
        for _ in 0..4 {
            let c = w.connect(0, 1);
            if let Some(sig) = w.set.on_connection_event(&w.net.drain_events()[0]).unwrap() {
                signal = Some(sig);
            }
            w.net.disconnect(c, w.now).unwrap();
            w.net.drain_events();
            w.now += 5.0;
        }
        assert_eq!(signal.map(|s| s.contacts), Some(4));
        assert_eq!(w.router(0).throttle_signals().len(), 1);
        assert!(w.router(1).throttle_signals().is_empty());
    }
}
