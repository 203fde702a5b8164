//! Per-tick energy cost model.
//!
//! Runs after the routing phase.  For each host with an energy model, with
//! `delta` the seconds since that host's previous pass:
//!
//! | Condition                              | Category        | Amount                          |
//! |----------------------------------------|-----------------|---------------------------------|
//! | movement active                        | `Base`          | `baseEnergy × delta`            |
//! | interface sending                      | `Transmit`      | `transmitEnergy × delta`        |
//! | ... and receiver side active, range > 0| `Receive` (peer)| `receiveEnergy × delta`         |
//! | active, range > 0, not transferring    | `Scan`          | `scanEnergy × unbilled / interval` |
//! | asleep                                 | `Sleep`         | `sleepEnergy × delta`           |
//! | otherwise                              | `InterfaceBase` | `iBaseEnergy × delta`           |
//!
//! Every row requires the host's movement to be active; a parked host pays
//! nothing.  Reception is the only debit written to another host's budget.
//! Scan time accrued while the radio was transferring, inactive or parked is
//! forgiven rather than billed later.

use opp_core::HostId;
use opp_energy::EnergyCategory;
use opp_net::{HostState, Network};

use crate::{Host, SimResult};

pub(crate) fn energy_phase(
    hosts: &mut [Host],
    net: &mut Network,
    states: &[HostState],
    now: f64,
) -> SimResult<()> {
    let mut charges: Vec<(usize, EnergyCategory, f64)> = Vec::new();

    for h in 0..hosts.len() {
        let Some(budget) = hosts[h].energy.as_ref() else { continue };
        let host = HostId(h as u32);
        let state = states[h];
        let delta = budget.elapsed_since_update(now).max(0.0);

        charges.clear();
        if state.movement_active {
            charges.push((h, EnergyCategory::Base, budget.base_rate() * delta));
            radio_charges(net, host, states, now, delta, &mut charges)?;
        }

        // Scan billing mutates the interfaces' scan clocks.
        let ids = net.interfaces_of(host).to_vec();
        for id in ids {
            let scanning = {
                let iface = net.interface(id)?;
                state.movement_active
                    && iface.is_active(&state, now)
                    && iface.range > 0.0
                    && !net.is_transferring(id)
            };
            let iface = net.interface_mut(id)?;
            if scanning {
                let secs = iface.scan.take_unbilled();
                if secs > 0.0 {
                    let amount = iface.rates.scan * secs / iface.scan.billing_interval();
                    charges.push((h, EnergyCategory::Scan, amount));
                }
            } else {
                iface.scan.forgive(now);
            }
        }

        for &(target, category, amount) in &charges {
            if let Some(b) = hosts[target].energy.as_mut() {
                b.charge(category, amount, now);
            }
        }
        if let Some(b) = hosts[h].energy.as_mut() {
            b.mark_updated(now);
        }
    }
    Ok(())
}

/// Transmit, receive and idle or sleep charges for the radios of one host
/// whose movement is active.
fn radio_charges(
    net: &Network,
    host: HostId,
    states: &[HostState],
    now: f64,
    delta: f64,
    charges: &mut Vec<(usize, EnergyCategory, f64)>,
) -> SimResult<()> {
    let h = host.index();
    let state = states[h];
    for &id in net.interfaces_of(host) {
        let iface = net.interface(id)?;
        let radio_on = iface.is_active(&state, now) && iface.range > 0.0;

        if radio_on && net.is_transferring(id) {
            for &c in iface.connections() {
                let Some(conn) = net.connection(c) else { continue };
                if !conn.is_sending(host) {
                    continue;
                }
                charges.push((h, EnergyCategory::Transmit, iface.rates.transmit * delta));

                let peer = net.interface(conn.other_iface(id))?;
                let peer_state = states[peer.host.index()];
                if peer.is_active(&peer_state, now) && peer.range > 0.0 {
                    let amount = peer.rates.receive * delta;
                    charges.push((peer.host.index(), EnergyCategory::Receive, amount));
                }
            }
        }

        let category =
            if iface.is_asleep() { EnergyCategory::Sleep } else { EnergyCategory::InterfaceBase };
        let rate = if iface.is_asleep() { iface.rates.sleep } else { iface.rates.base };
        charges.push((h, category, rate * delta));
    }
    Ok(())
}
