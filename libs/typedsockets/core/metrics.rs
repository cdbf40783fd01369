use std::sync::atomic::{AtomicU64, Ordering};

/// Server metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub connections_accepted: u64,
    pub disconnections: u64,
    pub messages_received: u64,
    pub decode_failures: u64,
    pub probes_sent: u64,
    pub terminations: u64,
    pub broadcasts: u64,
}

impl Metrics {
    /// Connections accepted and not yet closed
    pub fn active_connections(&self) -> u64 {
        self.connections_accepted.saturating_sub(self.disconnections)
    }
}

/// Lock-free counters updated by the server loop
///
/// Relaxed ordering throughout: counters are informational and never used to
/// synchronize other state.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    connections_accepted: AtomicU64,
    disconnections: AtomicU64,
    messages_received: AtomicU64,
    decode_failures: AtomicU64,
    probes_sent: AtomicU64,
    terminations: AtomicU64,
    broadcasts: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_connections(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_disconnections(&self) {
        self.disconnections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_decode_failures(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_probes(&self, count: usize) {
        self.probes_sent.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_terminations(&self, count: usize) {
        self.terminations.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_broadcasts(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Metrics {
        Metrics {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            disconnections: self.disconnections.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            probes_sent: self.probes_sent.load(Ordering::Relaxed),
            terminations: self.terminations.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
        }
    }
}
