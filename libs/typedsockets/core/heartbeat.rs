//! Heartbeat sweep for dead-peer detection
//!
//! # Liveness state machine
//!
//! ```text
//!            tick, alive            tick, still probed
//!  ┌───────┐ ──────────> ┌────────┐ ─────────────────> ┌────────────┐
//!  │ Alive │             │ Probed │                    │ Terminated │
//!  └───────┘ <────────── └────────┘                    └────────────┘
//!              inbound activity
//! ```
//!
//! On every tick each registered handle is visited once:
//! - alive → flag cleared, ping sent
//! - still probed from the previous tick → terminated
//!
//! A peer that stays silent is therefore dropped between one and two
//! intervals after its last activity. Termination only asks the transport to
//! kill the socket; the handle leaves the registry when the transport reports
//! the close, like any other disconnect.
//!
//! # Timing
//!
//! The monitor runs on the server loop rather than in its own task, so sweeps
//! never overlap with message or close handling. The first tick fires one full
//! interval after start; missed ticks are skipped rather than bursted.

use crate::core::client::ClientHandle;
use crate::manager::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Handles that were alive and got a probe
    pub probed: usize,
    /// Handles that ignored the previous probe and were terminated
    pub terminated: usize,
}

/// Periodic liveness timer owned by the server loop
///
/// Dropping the monitor cancels the timer.
pub struct HeartbeatMonitor {
    ticker: Interval,
    period: Duration,
}

impl HeartbeatMonitor {
    /// Create a monitor whose first tick is one `period` from now
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!("Heartbeat monitor started with interval: {:?}", period);
        Self { ticker, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next sweep deadline
    pub async fn tick(&mut self) {
        self.ticker.tick().await;
    }
}

/// Run one liveness sweep over the registry
pub fn sweep<S>(registry: &Registry<S>) -> SweepReport {
    let mut report = SweepReport::default();

    for handle in registry.handles() {
        if probe_or_terminate(handle) {
            report.probed += 1;
        } else {
            report.terminated += 1;
        }
    }

    report
}

/// Returns `true` if the handle was probed, `false` if it was terminated
fn probe_or_terminate<S>(handle: &Arc<ClientHandle<S>>) -> bool {
    if handle.is_alive() {
        handle.mark_probed();
        handle.ping();
        true
    } else {
        debug!("Connection {} missed its heartbeat, terminating", handle.id());
        handle.terminate();
        false
    }
}
