//! Health state of the downstream tiers.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Connection state of the relational sink.
///
/// `Unknown → Connected` on the first successful probe or write,
/// `→ Degraded` on any failure, `→ Connected` again on the next success.
/// There is no reconnection loop; the next probe or write moves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkHealth {
    Unknown,
    Connected,
    Degraded,
}

impl SinkHealth {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => SinkHealth::Connected,
            2 => SinkHealth::Degraded,
            _ => SinkHealth::Unknown,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SinkHealth::Unknown => 0,
            SinkHealth::Connected => 1,
            SinkHealth::Degraded => 2,
        }
    }
}

/// Lock-free holder of a [`SinkHealth`], shared between writes and probes.
///
/// Also counts failed writes. The counter only grows, so a caller can tell
/// whether its own write failed even if a ping has since flipped the state
/// back to Connected.
#[derive(Debug)]
pub struct HealthState {
    state: AtomicU8,
    write_failures: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SinkHealth::Unknown.as_u8()),
            write_failures: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> SinkHealth {
        SinkHealth::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn mark_connected(&self) {
        self.state
            .store(SinkHealth::Connected.as_u8(), Ordering::Release);
    }

    pub fn mark_degraded(&self) {
        self.state
            .store(SinkHealth::Degraded.as_u8(), Ordering::Release);
    }

    /// Record the outcome of a probe.
    pub fn record(&self, ok: bool) {
        if ok {
            self.mark_connected();
        } else {
            self.mark_degraded();
        }
    }

    /// Record a failed write: Degraded, and one more on the failure counter.
    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::AcqRel);
        self.mark_degraded();
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Acquire)
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-tier reachability as returned by `Logger::health_check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub intermediate_buffer: bool,
    pub relational_sink: bool,
    /// The in-process queue cannot fail; always `true`.
    pub entry_queue: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.intermediate_buffer && self.relational_sink && self.entry_queue
    }
}
