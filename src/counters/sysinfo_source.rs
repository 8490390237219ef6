// Counter source backed by sysinfo (Windows, macOS, other Unix).

use super::{CounterSource, CpuPacer, is_excluded_mount};
use crate::error::CounterError;
use crate::format::round_to;
use crate::models::{CpuIdentity, CpuTimes, DiskReading, MemoryReading, NetCounters, RawSample};
use std::time::{Duration, Instant};
use sysinfo::{Disks, Networks, ProcessesToUpdate, System};

/// sysinfo only reports CPU usage as a percentage since its previous refresh,
/// so usage is integrated into synthetic cumulative busy/idle milliseconds.
/// Diffing those counters across cycles yields the time-weighted average
/// usage over the cycle, the same quantity /proc/stat deltas give on Linux.
pub struct SysinfoSource {
    sys: System,
    networks: Networks,
    pacer: CpuPacer,
    cpu_ms: CpuTimes,
    last_cpu_refresh: Option<Instant>,
}

impl SysinfoSource {
    pub fn new(cpu_window: Duration) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();
        Self {
            sys,
            networks: Networks::new_with_refreshed_list(),
            // sysinfo needs this much time between refreshes for a meaningful usage figure
            pacer: CpuPacer::new(cpu_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)),
            cpu_ms: CpuTimes::default(),
            last_cpu_refresh: None,
        }
    }

    fn accumulate_cpu(&mut self) -> CpuTimes {
        let now = Instant::now();
        self.sys.refresh_cpu_all();
        let usage = (self.sys.global_cpu_usage() as f64).clamp(0.0, 100.0);
        if let Some(prev) = self.last_cpu_refresh {
            let ms = now.duration_since(prev).as_millis() as u64;
            let busy = (ms as f64 * usage / 100.0).round() as u64;
            self.cpu_ms.user = self.cpu_ms.user.saturating_add(busy);
            self.cpu_ms.idle = self.cpu_ms.idle.saturating_add(ms.saturating_sub(busy));
        }
        self.last_cpu_refresh = Some(now);
        self.cpu_ms
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl CounterSource for SysinfoSource {
    fn sample(&mut self) -> Result<RawSample, CounterError> {
        self.pacer.pace();
        let cpu = self.accumulate_cpu();
        let taken_at = Instant::now();
        self.networks.refresh(true);
        let net = self
            .networks
            .list()
            .values()
            .fold(NetCounters::default(), |acc, data| NetCounters {
                bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
                bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
                packets_sent: acc
                    .packets_sent
                    .saturating_add(data.total_packets_transmitted()),
            });
        Ok(RawSample { cpu, net, taken_at })
    }

    fn memory(&mut self) -> Result<MemoryReading, CounterError> {
        self.sys.refresh_memory();
        let mem_total = self.sys.total_memory();
        if mem_total == 0 {
            return Err(CounterError::new("memory", "total memory reported as 0"));
        }
        Ok(MemoryReading {
            mem_total,
            mem_used: self.sys.used_memory().min(mem_total),
            swap_total: self.sys.total_swap(),
            swap_used: self.sys.used_swap(),
        })
    }

    fn process_count(&mut self) -> Result<u64, CounterError> {
        self.sys.refresh_processes(ProcessesToUpdate::All, true);
        Ok(self.sys.processes().len() as u64)
    }

    fn uptime_secs(&mut self) -> Result<u64, CounterError> {
        Ok(System::uptime())
    }

    fn static_info(&mut self) -> Result<CpuIdentity, CounterError> {
        self.sys.refresh_cpu_all();
        let cpus = self.sys.cpus();
        let first = cpus
            .first()
            .ok_or_else(|| CounterError::new("cpu_identity", "no CPUs reported"))?;
        let model = Some(first.brand().trim())
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown")
            .to_string();
        let freq_ghz = Some(first.frequency())
            .filter(|mhz| *mhz > 0)
            .map(|mhz| round_to(mhz as f64 / 1000.0, 3));
        Ok(CpuIdentity {
            model,
            count: cpus.len() as u32,
            freq_ghz,
        })
    }

    fn disk_list(&mut self) -> Result<Vec<DiskReading>, CounterError> {
        let disks = Disks::new_with_refreshed_list();
        Ok(disks
            .list()
            .iter()
            .filter_map(|d| {
                let mount = d.mount_point().to_string_lossy().into_owned();
                let fs_type = d.file_system().to_string_lossy().into_owned();
                if cfg!(unix) && is_excluded_mount(&fs_type, &mount) {
                    return None;
                }
                // Inaccessible partitions (locked volumes, empty card readers) report no size.
                let total = d.total_space();
                if total == 0 {
                    return None;
                }
                Some(DiskReading {
                    mount,
                    fs_type,
                    total,
                    used: total.saturating_sub(d.available_space()),
                })
            })
            .collect())
    }

    fn os_name(&mut self) -> String {
        System::long_os_version().unwrap_or_else(|| {
            let name = System::name().unwrap_or_else(|| std::env::consts::OS.into());
            let version = System::os_version().unwrap_or_default();
            format!("{name} {version}").trim_end().to_string()
        })
    }
}
