//! Per-host message buffer, kept in receive order.

use opp_core::MessageId;

use crate::message::Message;

#[derive(Clone, Debug)]
struct Buffered {
    msg:         Message,
    received_at: f64,
}

/// Messages held by one host.  Iteration order is receive order (FIFO).
#[derive(Clone, Debug, Default)]
pub struct MessageBuffer {
    capacity: Option<u64>,
    used:     u64,
    entries:  Vec<Buffered>,
}

impl MessageBuffer {
    /// `capacity` in bytes; `None` is unbounded.
    pub fn new(capacity: Option<u64>) -> Self {
        Self { capacity, used: 0, entries: Vec::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn used(&self) -> u64 {
        self.used
    }

    #[inline]
    pub fn capacity(&self) -> Option<u64> {
        self.capacity
    }

    /// Free bytes; `None` when unbounded.
    pub fn free(&self) -> Option<u64> {
        self.capacity.map(|c| c.saturating_sub(self.used))
    }

    fn position(&self, id: MessageId) -> Option<usize> {
        self.entries.iter().position(|e| e.msg.id == id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.entries.iter().find(|e| e.msg.id == id).map(|e| &e.msg)
    }

    pub fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.entries.iter_mut().find(|e| e.msg.id == id).map(|e| &mut e.msg)
    }

    /// When `id` entered this buffer.
    pub fn received_at(&self, id: MessageId) -> Option<f64> {
        self.entries.iter().find(|e| e.msg.id == id).map(|e| e.received_at)
    }

    /// Messages in receive order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        self.entries.iter().map(|e| &e.msg)
    }

    pub fn ids(&self) -> Vec<MessageId> {
        self.entries.iter().map(|e| e.msg.id).collect()
    }

    /// Append `msg`, replacing any copy with the same id.
    pub fn insert(&mut self, msg: Message, received_at: f64) {
        self.remove(msg.id);
        self.used += msg.size;
        self.entries.push(Buffered { msg, received_at });
    }

    pub fn remove(&mut self, id: MessageId) -> Option<Message> {
        let pos = self.position(id)?;
        let e = self.entries.remove(pos);
        self.used -= e.msg.size;
        Some(e.msg)
    }

    /// Evict oldest-received messages not being sent until `size` bytes fit.
    ///
    /// Returns the evicted messages, or `None` (evicting nothing) when the
    /// space cannot be made.
    pub fn make_room(
        &mut self,
        size: u64,
        is_sending: impl Fn(MessageId) -> bool,
    ) -> Option<Vec<Message>> {
        let Some(capacity) = self.capacity else { return Some(Vec::new()) };
        if size > capacity {
            return None;
        }
        let evictable: u64 = self
            .entries
            .iter()
            .filter(|e| !is_sending(e.msg.id))
            .map(|e| e.msg.size)
            .sum();
        let free = capacity.saturating_sub(self.used);
        if free + evictable < size {
            return None;
        }

        let mut evicted = Vec::new();
        while self.free().unwrap_or(u64::MAX) < size {
            let Some(pos) = self.entries.iter().position(|e| !is_sending(e.msg.id)) else { break };
            let e = self.entries.remove(pos);
            self.used -= e.msg.size;
            evicted.push(e.msg);
        }
        Some(evicted)
    }
}
