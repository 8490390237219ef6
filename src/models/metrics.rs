// Metrics derived from one collection cycle

use super::{CpuIdentity, NetCounters};
use crate::format::round_to;

/// Rates computed from two consecutive raw samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rates {
    pub cpu_usage_pct: f64,
    pub net_send_kbps: f64,
    pub net_recv_kbps: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryUsage {
    pub total: u64,
    pub used: u64,
    pub percent: f64,
}

impl MemoryUsage {
    /// Percent of `total` in use; an empty pool reports 0 instead of dividing by zero.
    pub fn new(total: u64, used: u64) -> Self {
        let percent = round_to(used as f64 / total.max(1) as f64 * 100.0, 2);
        Self {
            total,
            used,
            percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskUsage {
    pub mount: String,
    pub total: u64,
    pub used: u64,
    pub used_percent: f64,
}

impl DiskUsage {
    pub fn new(mount: String, total: u64, used: u64) -> Self {
        let used_percent = round_to(used as f64 / total.max(1) as f64 * 100.0, 2);
        Self {
            mount,
            total,
            used,
            used_percent,
        }
    }
}

/// Output of one cycle. `None` marks a field that has never been readable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedMetrics {
    pub rates: Rates,
    pub cpu: Option<CpuIdentity>,
    pub memory: Option<MemoryUsage>,
    pub swap: Option<MemoryUsage>,
    pub network: Option<NetCounters>,
    pub process_count: Option<u64>,
    pub uptime_secs: Option<u64>,
    pub disks: Vec<DiskUsage>,
}
