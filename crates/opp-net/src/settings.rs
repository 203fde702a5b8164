//! Interface prototypes read from settings.

use opp_core::{CoreError, CoreResult, HostId, InterfaceId, Scope, SettingRange, SimRng};

use crate::activeness::{ActivenessSchedule, SyncSleep};
use crate::interface::{InterfaceRates, NetworkInterface};
use crate::scan::ScanClock;

/// Per-group interface parameters.  Ranged values are drawn per instance by
/// [`instantiate`](Self::instantiate).
///
/// | Key                       | Default | Unit / meaning                       |
/// |---------------------------|---------|--------------------------------------|
/// | `type`                    | ns name | type tag; only equal tags connect    |
/// | `transmitRange`           | none    | metres; `<= 0` disables discovery    |
/// | `transmitSpeed`           | none    | bytes per second                     |
/// | `scanInterval`            | 0       | seconds; 0 scans continuously        |
/// | `scanEnergy`              | 0       | energy per scan interval             |
/// | `transmitEnergy`          | 0       | energy per second sending            |
/// | `receiveEnergy`           | 0       | energy per second receiving          |
/// | `iBaseEnergy`             | 0       | energy per second awake              |
/// | `sleepEnergy`             | 0       | energy per second asleep             |
/// | `syncIS`                  | off     | `awake,total` seconds                |
/// | `disconnectWhenNotActive` | true    | tear down links of inactive radios   |
/// | `activeTimes`             | always  | `start,end,...` windows              |
/// | `activenessOffsetJitter`  | 0       | max per-instance window offset       |
#[derive(Clone, Debug)]
pub struct InterfaceSettings {
    pub kind:                     String,
    pub range:                    SettingRange,
    pub speed:                    SettingRange,
    pub scan_interval:            SettingRange,
    pub scan_energy:              SettingRange,
    pub transmit_energy:          SettingRange,
    pub receive_energy:           SettingRange,
    pub base_energy:              SettingRange,
    pub sleep_energy:             SettingRange,
    pub sync_sleep:               Option<SyncSleep>,
    pub disconnect_when_inactive: bool,
    pub schedule:                 Option<ActivenessSchedule>,
    pub jitter_max:               u64,
}

impl InterfaceSettings {
    /// Read an interface prototype.  `default_kind` is used when the scope
    /// carries no `type` key, normally the interface namespace name.
    pub fn from_settings(scope: &Scope<'_>, default_kind: &str) -> CoreResult<Self> {
        let kind = scope.string_opt("type").unwrap_or_else(|| default_kind.to_owned());
        let range = non_negative(scope, "transmitRange", scope.range("transmitRange")?)?;
        let speed = non_negative(scope, "transmitSpeed", scope.range("transmitSpeed")?)?;
        let scan_interval = non_negative(scope, "scanInterval", scope.range_or("scanInterval", 0.0)?)?;

        Ok(Self {
            kind,
            range,
            speed,
            scan_interval,
            scan_energy:              scope.range_or("scanEnergy", 0.0)?,
            transmit_energy:          scope.range_or("transmitEnergy", 0.0)?,
            receive_energy:           scope.range_or("receiveEnergy", 0.0)?,
            base_energy:              scope.range_or("iBaseEnergy", 0.0)?,
            sleep_energy:             scope.range_or("sleepEnergy", 0.0)?,
            sync_sleep:               SyncSleep::from_settings(scope)?,
            disconnect_when_inactive: scope.bool_or("disconnectWhenNotActive", true)?,
            schedule:                 ActivenessSchedule::from_settings(scope)?,
            jitter_max:               scope.u64_or("activenessOffsetJitter", 0)?,
        })
    }

    /// A fixed-value prototype with no energy costs, mainly for tests and
    /// programmatic scenarios.
    pub fn fixed(kind: &str, range: f64, speed: f64, scan_interval: f64) -> Self {
        let zero = SettingRange::scalar(0.0);
        Self {
            kind:                     kind.to_owned(),
            range:                    SettingRange::scalar(range),
            speed:                    SettingRange::scalar(speed),
            scan_interval:            SettingRange::scalar(scan_interval),
            scan_energy:              zero,
            transmit_energy:          zero,
            receive_energy:           zero,
            base_energy:              zero,
            sleep_energy:             zero,
            sync_sleep:               None,
            disconnect_when_inactive: true,
            schedule:                 None,
            jitter_max:               0,
        }
    }

    /// Create one interface.  Draw order from `rng`: range, speed, scan
    /// interval, the five energy rates, jitter, first scan anchor.
    pub fn instantiate(&self, id: InterfaceId, host: HostId, rng: &mut SimRng) -> NetworkInterface {
        let range = self.range.draw(rng);
        let speed = self.speed.draw(rng);
        let scan_interval = self.scan_interval.draw(rng);
        let rates = InterfaceRates {
            scan:     self.scan_energy.draw(rng),
            transmit: self.transmit_energy.draw(rng),
            receive:  self.receive_energy.draw(rng),
            base:     self.base_energy.draw(rng),
            sleep:    self.sleep_energy.draw(rng),
        };
        let jitter = rng.below(self.jitter_max) as f64;
        let anchor = rng.uniform(0.0, scan_interval);

        NetworkInterface::new(
            id,
            host,
            self.kind.clone(),
            range,
            speed,
            rates,
            ScanClock::new(scan_interval, anchor),
        )
        .with_sync_sleep(self.sync_sleep)
        .with_schedule(self.schedule.clone(), jitter)
        .disconnect_when_inactive(self.disconnect_when_inactive)
    }
}

fn non_negative(scope: &Scope<'_>, key: &str, value: SettingRange) -> CoreResult<SettingRange> {
    if value.min < 0.0 {
        return Err(CoreError::InvalidSetting {
            key:    format!("{}.{}", scope.namespace(), key),
            value:  format!("{},{}", value.min, value.max),
            reason: "negative values are not accepted".to_owned(),
        });
    }
    Ok(value)
}
