//! Router configuration.

use opp_core::{CoreError, Scope};

use crate::density::{DEFAULT_DENSITY_LIMIT, DEFAULT_TIME_LIMIT};
use crate::policy::{
    DensityAware, DirectDelivery, Epidemic, ReplicationPolicy, RouterKind, SprayAndWait,
};
use crate::RoutingResult;

/// Order in which buffered messages are offered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum QueueMode {
    /// Shuffled on every attempt (`sendQueue = 1`).
    Random,
    /// Oldest received first (`sendQueue = 2`).
    #[default]
    Fifo,
}

/// Per-group router parameters.
///
/// Group keys: `router`, `bufferSize` (bytes, unbounded if absent), `msgTtl`
/// (minutes, infinite if absent), `sendQueue`.  Spray-and-wait variants
/// read `nrofCopies`, `binaryMode`, `densityLimit` and `timeLimit` from the
/// namespace named after the router.
#[derive(Clone, Debug, PartialEq)]
pub struct RouterSettings {
    pub kind:          RouterKind,
    pub buffer_size:   Option<u64>,
    pub msg_ttl:       Option<f64>,
    pub queue_mode:    QueueMode,
    pub copies:        u32,
    pub binary:        bool,
    pub density_limit: f64,
    pub time_limit:    f64,
}

impl RouterSettings {
    /// Defaults for `kind`: unbounded buffer, no TTL, FIFO, one copy.
    pub fn new(kind: RouterKind) -> Self {
        Self {
            kind,
            buffer_size:   None,
            msg_ttl:       None,
            queue_mode:    QueueMode::Fifo,
            copies:        1,
            binary:        false,
            density_limit: DEFAULT_DENSITY_LIMIT,
            time_limit:    DEFAULT_TIME_LIMIT,
        }
    }

    pub fn with_copies(mut self, copies: u32, binary: bool) -> Self {
        self.copies = copies;
        self.binary = binary;
        self
    }

    pub fn from_settings(group: &Scope<'_>) -> RoutingResult<Self> {
        let kind: RouterKind = group.string("router")?.parse()?;
        let mut s = Self::new(kind);

        if group.contains("bufferSize") {
            s.buffer_size = Some(group.u64("bufferSize")?);
        }
        if group.contains("msgTtl") {
            s.msg_ttl = Some(group.f64("msgTtl")?);
        }
        s.queue_mode = match group.u64_or("sendQueue", 2)? {
            1 => QueueMode::Random,
            2 => QueueMode::Fifo,
            other => {
                let reason = "expected 1 (random) or 2 (FIFO)";
                return Err(invalid(group, "sendQueue", &other.to_string(), reason).into());
            }
        };

        if kind.uses_copies() {
            let ns = group.root().scoped(kind.as_str());
            let copies = ns.u64("nrofCopies")?;
            s.copies = u32::try_from(copies)
                .ok()
                .filter(|&c| c > 0)
                .ok_or_else(|| invalid(&ns, "nrofCopies", &copies.to_string(), "must be a positive count"))?;
            s.binary = ns.bool_or("binaryMode", false)?;
            s.density_limit = ns.f64_or("densityLimit", DEFAULT_DENSITY_LIMIT)?;
            s.time_limit = ns.f64_or("timeLimit", DEFAULT_TIME_LIMIT)?;
        }
        Ok(s)
    }

    /// Build the replication policy for one host.
    pub fn build_policy(&self) -> Box<dyn ReplicationPolicy> {
        match self.kind {
            RouterKind::EpidemicWithAck => Box::new(Epidemic),
            RouterKind::DirectDeliveryWithAck => Box::new(DirectDelivery),
            RouterKind::SprayAndWait => Box::new(SprayAndWait::new(self.copies, self.binary)),
            RouterKind::DensityAware => Box::new(DensityAware::new(
                SprayAndWait::new(self.copies, self.binary),
                self.density_limit,
                self.time_limit,
            )),
        }
    }
}

fn invalid(scope: &Scope<'_>, key: &str, value: &str, reason: &str) -> CoreError {
    CoreError::InvalidSetting {
        key:    format!("{}.{}", scope.namespace(), key),
        value:  value.to_owned(),
        reason: reason.to_owned(),
    }
}
