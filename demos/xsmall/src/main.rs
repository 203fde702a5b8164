//! xsmall: smallest runnable scenario for the opportunistic-network simulator.
//!
//! Eleven hosts on a synthetic campus: six walkers with short-range radios,
//! two shuttles carrying both a short-range and a long-range radio, and three
//! fixed kiosks that duty-cycle their long-range radio.  Every host runs the
//! density-aware spray router.  Messages are injected every two minutes
//! between rotating host pairs and the run ends with delivery and energy
//! tables.
//!
//! Set `RUST_LOG=opp_routing=trace` to follow individual offers.

mod scenario;

use std::io::Cursor;
use std::time::Instant;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use opp_core::{HostId, Settings, Tick};
use opp_energy::EnergyCategory;
use opp_net::{ConnectionChange, ConnectionEvent, Network};
use opp_routing::{Message, RouterSet, ThrottleSignal};
use opp_sim::{Host, SimBuilder, SimObserver, WaypointMovement};

use scenario::{KIOSKS, SHUTTLES, WALKERS, build_paths};

// ── Constants ─────────────────────────────────────────────────────────────────

const HOST_COUNT:        usize = WALKERS + SHUTTLES + KIOSKS;
const MSG_SIZE:          u64   = 10_000;           // bytes
const MSG_INTERVAL_SECS: f64   = 120.0;
const TRAFFIC_END_SECS:  f64   = 6_000.0;          // leave an hour of drain time

// ── Settings CSV ──────────────────────────────────────────────────────────────

// Group1 walkers, Group2 shuttles, Group3 kiosks (host ids in that order).
// Ranges such as "8,12" are drawn uniformly per interface.
const SETTINGS_CSV: &str = "\
key,value
Scenario.endTime,7200
Scenario.updateInterval,1
Scenario.seed,42
Scenario.snapshotInterval,600
Scenario.nrofHostGroups,3
Report.warmup,300
# defaults for every group
Group.router,DensityAwareRouter
Group.bufferSize,50000
Group.msgTtl,60
Group.nrofInterfaces,1
Group.interface1,btInterface
DensityAwareRouter.nrofCopies,6
DensityAwareRouter.binaryMode,true
DensityAwareRouter.densityLimit,4
DensityAwareRouter.timeLimit,60
btInterface.type,bt
btInterface.transmitRange,\"8,12\"
btInterface.transmitSpeed,2000
btInterface.scanInterval,\"5,10\"
btInterface.scanEnergy,0.5
btInterface.transmitEnergy,0.08
btInterface.receiveEnergy,0.08
btInterface.iBaseEnergy,0.001
btInterface.sleepEnergy,0.0001
wifiInterface.type,wifi
wifiInterface.transmitRange,40
wifiInterface.transmitSpeed,20000
wifiInterface.scanInterval,10
wifiInterface.scanEnergy,2.0
wifiInterface.transmitEnergy,0.4
wifiInterface.receiveEnergy,0.4
wifiInterface.iBaseEnergy,0.01
wifiInterface.sleepEnergy,0.001
Energy.initialEnergy,\"400,600\"
Energy.baseEnergy,0.01
Energy.energyWarmup,-1
Group1.groupID,walker
Group1.nrofHosts,6
Group2.groupID,shuttle
Group2.nrofHosts,2
Group2.nrofInterfaces,2
Group2.interface2,wifiInterface
Group2.initialEnergy,20000
Group3.groupID,kiosk
Group3.nrofHosts,3
Group3.interface1,wifiInterface
Group3.net.syncIS,\"1200,1800\"
Group3.net.activeTimes,\"0,3600,4200,7200\"
Group3.net.activenessOffsetJitter,120
";

// ── Observer ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct DemoObserver {
    links_up:      usize,
    links_down:    usize,
    aborted:       usize,
    delivered:     usize,
    latency_sum:   f64,
    throttles:     usize,
}

impl SimObserver for DemoObserver {
    fn on_connection(&mut self, event: &ConnectionEvent) {
        match event.change {
            ConnectionChange::Up => self.links_up += 1,
            ConnectionChange::Down => {
                self.links_down += 1;
                if event.aborted.is_some() {
                    self.aborted += 1;
                }
            }
        }
    }

    fn on_message_delivered(&mut self, msg: &Message, now: f64) {
        self.delivered += 1;
        self.latency_sum += now - msg.created;
    }

    fn on_throttle(&mut self, host: HostId, signal: ThrottleSignal) {
        self.throttles += 1;
        info!(%host, contacts = signal.contacts, at = signal.at, "host throttled");
    }

    fn on_snapshot(&mut self, tick: Tick, hosts: &[Host], net: &Network, routers: &RouterSet) {
        let buffered: usize = routers.iter().map(|r| r.buffer().len()).sum();
        let alive = hosts.iter().filter(|h| h.has_energy()).count();
        info!(
            tick = tick.0,
            connections = net.connection_count(),
            buffered,
            delivered = self.delivered,
            alive,
            "progress"
        );
    }
}

/// Deterministic rotation over host pairs; never addresses a host to itself.
fn traffic_pair(k: usize) -> (HostId, HostId) {
    let from = k % HOST_COUNT;
    let mut to = (k * 7 + 3) % HOST_COUNT;
    if to == from {
        to = (to + 1) % HOST_COUNT;
    }
    (HostId(from as u32), HostId(to as u32))
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    println!("=== xsmall: opportunistic network ===");
    println!("Walkers: {WALKERS}  |  Shuttles: {SHUTTLES}  |  Kiosks: {KIOSKS}");
    println!();

    // 1. Load settings.
    let settings = Settings::from_reader(Cursor::new(SETTINGS_CSV))?;
    println!("Loaded {} settings", settings.len());

    // 2. Movement.
    let end_time = settings.scoped("Scenario").f64("endTime")?;
    let movement = WaypointMovement::new(build_paths(end_time));

    // 3. Build sim.
    let mut sim = SimBuilder::from_settings(&settings, movement)?.build()?;
    println!(
        "Sim: {} ticks of {} s, {} interfaces",
        sim.config.total_ticks,
        sim.config.tick_secs,
        sim.net.interfaces().len()
    );
    println!();

    // 4. Run, injecting traffic until TRAFFIC_END_SECS, then drain.
    let mut obs = DemoObserver::default();
    let interval_ticks = (MSG_INTERVAL_SECS / sim.config.tick_secs).round() as u64;
    let (mut created, mut refused) = (0usize, 0usize);
    let t0 = Instant::now();

    let mut k = 0;
    while sim.now() + MSG_INTERVAL_SECS <= TRAFFIC_END_SECS {
        sim.run_ticks(interval_ticks, &mut obs)?;
        let (from, to) = traffic_pair(k);
        k += 1;
        match sim.create_message(from, to, MSG_SIZE)? {
            Some(_) => created += 1,
            None => refused += 1,
        }
    }
    sim.run(&mut obs)?;
    let elapsed = t0.elapsed();

    // 5. Summary.
    println!("Simulation complete in {:.3} s", elapsed.as_secs_f64());
    println!("  messages created   : {created} ({refused} refused, buffer full)");
    println!(
        "  delivered          : {} ({:.1} %)",
        obs.delivered,
        100.0 * obs.delivered as f64 / created.max(1) as f64
    );
    if obs.delivered > 0 {
        println!("  mean latency       : {:.1} s", obs.latency_sum / obs.delivered as f64);
    }
    println!("  links up / down    : {} / {}", obs.links_up, obs.links_down);
    println!("  aborted transfers  : {}", obs.aborted);
    println!("  throttle signals   : {}", obs.throttles);
    println!();

    // 6. Per-host table.
    println!(
        "{:<6} {:<8} {:>7} {:>7} {:>7} {:>7} {:>9} {:>10}",
        "Host", "Group", "Started", "Relayed", "Deliv", "Dropped", "Energy %", "Empty at"
    );
    println!("{}", "-".repeat(70));
    for host in &sim.hosts {
        let stats = sim.router(host.id)?.stats();
        let (level, empty_at) = match &host.energy {
            Some(e) => (
                format!("{:.1}", 100.0 * e.level()),
                e.exhausted_at().map_or_else(|| "-".to_owned(), |t| format!("{t:.0}")),
            ),
            None => ("-".to_owned(), "-".to_owned()),
        };
        println!(
            "{:<6} {:<8} {:>7} {:>7} {:>7} {:>7} {:>9} {:>10}",
            host.id.to_string(),
            host.group,
            stats.started,
            stats.relayed,
            stats.delivered,
            stats.dropped,
            level,
            empty_at,
        );
    }
    println!();

    // 7. Energy by category, all hosts.
    println!("{:<16} {:>12}", "Category", "Consumed");
    println!("{}", "-".repeat(29));
    for category in EnergyCategory::ALL {
        let total: f64 = sim
            .hosts
            .iter()
            .filter_map(|h| h.energy.as_ref())
            .map(|e| e.usage().get(category))
            .sum();
        println!("{:<16} {:>12.2}", category.as_str(), total);
    }

    Ok(())
}
