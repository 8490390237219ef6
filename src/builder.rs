// One collection cycle: raw counters -> derived metrics -> formatted snapshot

use crate::cache::Cached;
use crate::counters::CounterSource;
use crate::error::CounterError;
use crate::format::{human_duration, human_rate, human_size};
use crate::models::{
    CpuIdentity, DerivedMetrics, DiskEntry, DiskReading, DiskUsage, MemoryUsage, Snapshot,
};
use crate::rates::RateEstimator;
use chrono::{DateTime, FixedOffset, Utc};
use std::time::Duration;
use tracing::instrument;

/// Placeholder for a field that has never been readable.
pub const UNKNOWN: &str = "unknown";

/// `lastUpdate` layout.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub secret_key: String,
    pub disk_ttl: Duration,
    /// Offset `lastUpdate` is rendered in.
    pub utc_offset: FixedOffset,
}

pub struct SnapshotBuilder {
    source: Box<dyn CounterSource>,
    estimator: RateEstimator,
    cpu_identity: Cached<CpuIdentity>,
    disks: Cached<Vec<DiskReading>>,
    /// Previous cycle's output; per-field fallback when a counter read fails.
    last: DerivedMetrics,
    os_name: String,
    config: BuilderConfig,
}

impl SnapshotBuilder {
    pub fn new(mut source: Box<dyn CounterSource>, config: BuilderConfig) -> Self {
        let os_name = source.os_name();
        Self {
            source,
            estimator: RateEstimator::new(),
            cpu_identity: Cached::forever(),
            disks: Cached::with_ttl(config.disk_ttl),
            last: DerivedMetrics::default(),
            os_name,
            config,
        }
    }

    pub fn os_name(&self) -> &str {
        &self.os_name
    }

    /// Collect and format one snapshot stamped with the current time.
    pub fn build(&mut self) -> Snapshot {
        let metrics = self.collect();
        self.render(&metrics, Utc::now())
    }

    /// Read every counter once. A failed read never aborts the cycle: the
    /// field keeps its previous value, or stays `None` if it never had one.
    #[instrument(skip_all, fields(operation = "collect_metrics"))]
    pub fn collect(&mut self) -> DerivedMetrics {
        let (rates, network) = match self.source.sample() {
            Ok(sample) => (self.estimator.observe(sample), Some(sample.net)),
            Err(e) => {
                warn_unavailable("sample", &e);
                (self.last.rates, self.last.network)
            }
        };

        let cpu = match self
            .cpu_identity
            .get_or_refresh(|| self.source.static_info())
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn_unavailable("static_info", &e);
                self.cpu_identity.last_good().cloned()
            }
        };

        let (memory, swap) = match self.source.memory() {
            Ok(m) => (
                Some(MemoryUsage::new(m.mem_total, m.mem_used)),
                Some(MemoryUsage::new(m.swap_total, m.swap_used)),
            ),
            Err(e) => {
                warn_unavailable("memory", &e);
                (self.last.memory, self.last.swap)
            }
        };

        let process_count = fallback(
            "process_count",
            self.source.process_count(),
            self.last.process_count,
        );
        let uptime_secs = fallback("uptime", self.source.uptime_secs(), self.last.uptime_secs);

        let disk_readings = match self.disks.get_or_refresh(|| self.source.disk_list()) {
            Ok(list) => list,
            Err(e) => {
                warn_unavailable("disk_list", &e);
                self.disks.last_good().cloned().unwrap_or_default()
            }
        };
        let disks = disk_readings
            .into_iter()
            .map(|d| DiskUsage::new(d.mount, d.total, d.used))
            .collect();

        let metrics = DerivedMetrics {
            rates,
            cpu,
            memory,
            swap,
            network,
            process_count,
            uptime_secs,
            disks,
        };
        self.last = metrics.clone();
        metrics
    }

    /// Format derived metrics into the outbound schema.
    pub fn render(&self, m: &DerivedMetrics, now: DateTime<Utc>) -> Snapshot {
        let size_or_unknown = |v: Option<u64>| v.map(human_size).unwrap_or_else(|| UNKNOWN.into());
        Snapshot {
            cpu_usage: m.rates.cpu_usage_pct,
            cpu_model: m
                .cpu
                .as_ref()
                .map(|c| c.model.clone())
                .unwrap_or_else(|| UNKNOWN.into()),
            cpu_count: m.cpu.as_ref().map(|c| c.count),
            cpu_freq: m.cpu.as_ref().and_then(|c| c.freq_ghz),
            mem_total: size_or_unknown(m.memory.map(|u| u.total)),
            mem_used: size_or_unknown(m.memory.map(|u| u.used)),
            mem_percent: m.memory.map(|u| u.percent),
            swap_total: size_or_unknown(m.swap.map(|u| u.total)),
            swap_used: size_or_unknown(m.swap.map(|u| u.used)),
            swap_percent: m.swap.map(|u| u.percent),
            network_sent: size_or_unknown(m.network.map(|n| n.bytes_sent)),
            network_received: size_or_unknown(m.network.map(|n| n.bytes_recv)),
            network_pocket_sent: m.network.map(|n| n.packets_sent),
            process_count: m.process_count,
            disks: m
                .disks
                .iter()
                .map(|d| {
                    DiskEntry(
                        d.mount.clone(),
                        human_size(d.total),
                        human_size(d.used),
                        d.used_percent,
                    )
                })
                .collect(),
            uptime: m
                .uptime_secs
                .map(human_duration)
                .unwrap_or_else(|| UNKNOWN.into()),
            sent_speed: human_rate(m.rates.net_send_kbps),
            recv_speed: human_rate(m.rates.net_recv_kbps),
            os: self.os_name.clone(),
            secret_key: self.config.secret_key.clone(),
            last_update: now
                .with_timezone(&self.config.utc_offset)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
        }
    }
}

fn fallback<T>(operation: &'static str, read: Result<T, CounterError>, last: Option<T>) -> Option<T> {
    match read {
        Ok(v) => Some(v),
        Err(e) => {
            warn_unavailable(operation, &e);
            last
        }
    }
}

fn warn_unavailable(operation: &'static str, e: &CounterError) {
    tracing::warn!(error = %e, operation, "counter unavailable; keeping previous value");
}
