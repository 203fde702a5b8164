//! Acknowledgement set and sent-message ledger.
//!
//! Both only grow.  Insertion and union are idempotent, so repeated delivery
//! of the same id on a later contact is harmless.

use opp_core::{HostId, MessageId};

#[cfg(feature = "fx-hash")]
pub(crate) type IdSet = rustc_hash::FxHashSet<MessageId>;
#[cfg(not(feature = "fx-hash"))]
pub(crate) type IdSet = std::collections::HashSet<MessageId>;

#[cfg(feature = "fx-hash")]
type HostMap<V> = rustc_hash::FxHashMap<HostId, V>;
#[cfg(not(feature = "fx-hash"))]
type HostMap<V> = std::collections::HashMap<HostId, V>;

// ── AckSet ────────────────────────────────────────────────────────────────────

/// Ids of messages known to have reached their final recipient.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AckSet {
    ids: IdSet,
}

impl AckSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `id` was new.
    #[inline]
    pub fn insert(&mut self, id: MessageId) -> bool {
        self.ids.insert(id)
    }

    #[inline]
    pub fn contains(&self, id: MessageId) -> bool {
        self.ids.contains(&id)
    }

    /// Add every id of `other`; returns how many were new.
    pub fn union(&mut self, other: &AckSet) -> usize {
        let before = self.ids.len();
        self.ids.extend(other.ids.iter().copied());
        self.ids.len() - before
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.ids.iter().copied()
    }
}

// ── SentLedger ────────────────────────────────────────────────────────────────

/// Which messages this host already forwarded to which neighbour.
#[derive(Clone, Debug, Default)]
pub struct SentLedger {
    sent: HostMap<IdSet>,
}

impl SentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if this `(to, id)` pair is new.
    pub fn record(&mut self, to: HostId, id: MessageId) -> bool {
        self.sent.entry(to).or_default().insert(id)
    }

    pub fn was_sent(&self, to: HostId, id: MessageId) -> bool {
        self.sent.get(&to).is_some_and(|s| s.contains(&id))
    }

    /// Number of distinct neighbours anything was sent to.
    pub fn destinations(&self) -> usize {
        self.sent.len()
    }

    /// Total `(neighbour, message)` pairs recorded.
    pub fn len(&self) -> usize {
        self.sent.values().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}
