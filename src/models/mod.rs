// Domain models: raw OS readings, derived metrics, outbound snapshot

mod metrics;
mod raw;
mod snapshot;

pub use metrics::{DerivedMetrics, DiskUsage, MemoryUsage, Rates};
pub use raw::{CpuIdentity, CpuTimes, DiskReading, MemoryReading, NetCounters, RawSample};
pub use snapshot::{DiskEntry, FIELD_NAMES, Snapshot};
