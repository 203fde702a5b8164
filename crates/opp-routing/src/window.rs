//! Rolling bytes-per-contact average.

/// Samples kept by [`TransferWindow`].
pub const TRANSFER_AVG_SAMPLES: usize = 10;

/// Circular window of the bytes moved over the last contacts.  Zero-byte
/// contacts occupy a slot but do not count toward the average.
#[derive(Clone, Debug, Default)]
pub struct TransferWindow {
    samples: [u64; TRANSFER_AVG_SAMPLES],
    next:    usize,
    average: u64,
}

impl TransferWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one contact and return the new average.
    pub fn push(&mut self, bytes: u64) -> u64 {
        self.samples[self.next] = bytes;
        self.next = (self.next + 1) % TRANSFER_AVG_SAMPLES;

        let (sum, count) = self
            .samples
            .iter()
            .filter(|&&b| b > 0)
            .fold((0u64, 0u64), |(s, n), &b| (s + b, n + 1));
        self.average = if count > 0 { sum / count } else { 0 };
        self.average
    }

    #[inline]
    pub fn average(&self) -> u64 {
        self.average
    }
}
