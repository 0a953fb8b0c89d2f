//! Regroups arbitrarily sized backend buffers into fixed notification periods.

/// Accumulates captured bytes and emits them one period at a time.
///
/// Platform callbacks deliver whatever the driver hands over; the session
/// expects exactly `period_bytes` per notification.
#[derive(Debug)]
pub struct PeriodAssembler {
    period_bytes: usize,
    pending: Vec<u8>,
}

impl PeriodAssembler {
    pub fn new(period_bytes: usize) -> Self {
        Self {
            period_bytes,
            pending: Vec::with_capacity(period_bytes * 2),
        }
    }

    /// Append `data`, calling `emit` once for every complete period.
    pub fn push(&mut self, data: &[u8], mut emit: impl FnMut(&[u8])) {
        if self.period_bytes == 0 {
            return;
        }
        self.pending.extend_from_slice(data);

        let whole = self.pending.len() / self.period_bytes * self.period_bytes;
        for period in self.pending[..whole].chunks_exact(self.period_bytes) {
            emit(period);
        }
        self.pending.drain(..whole);
    }

    /// Move up to `buf.len()` buffered bytes into `buf`. Returns the count.
    pub fn drain_into(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        n
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
