// Raw counter readings, exactly as the counter source produced them

use std::time::Instant;

/// Cumulative CPU time since boot split by state, in platform ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuTimes {
    /// Denominator for busy percentage. Guest time is already counted in
    /// `user`/`nice`, so it is left out.
    pub fn total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}

/// Host-wide network totals summed over every interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
}

/// One point-in-time read of the cumulative counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub cpu: CpuTimes,
    pub net: NetCounters,
    /// Monotonic capture time; rates divide by the measured gap between two of these.
    pub taken_at: Instant,
}

/// Instantaneous memory and swap figures in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryReading {
    pub mem_total: u64,
    pub mem_used: u64,
    pub swap_total: u64,
    pub swap_used: u64,
}

/// CPU identity; read once per process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuIdentity {
    pub model: String,
    pub count: u32,
    /// GHz, three decimals.
    pub freq_ghz: Option<f64>,
}

/// A mounted filesystem that passed the exclusion policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskReading {
    pub mount: String,
    pub fs_type: String,
    pub total: u64,
    pub used: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_total_sums_every_state() {
        let t = CpuTimes {
            user: 10,
            nice: 1,
            system: 5,
            idle: 100,
            iowait: 2,
            irq: 1,
            softirq: 1,
            steal: 0,
            guest: 0,
            guest_nice: 0,
        };
        assert_eq!(t.total(), 120);
    }

    #[test]
    fn cpu_total_skips_guest_time() {
        let t = CpuTimes {
            user: 50,
            idle: 50,
            guest: 20,
            guest_nice: 5,
            ..Default::default()
        };
        assert_eq!(t.total(), 100);
    }

    #[test]
    fn cpu_total_saturates() {
        let t = CpuTimes {
            user: u64::MAX,
            idle: 5,
            ..Default::default()
        };
        assert_eq!(t.total(), u64::MAX);
    }
}
