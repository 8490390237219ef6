// Linux counter source: /proc, /etc/os-release and statvfs.

use super::{CounterSource, CpuPacer, is_excluded_mount};
use crate::error::CounterError;
use crate::format::round_to;
use crate::models::{CpuIdentity, CpuTimes, DiskReading, MemoryReading, NetCounters, RawSample};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub struct ProcfsSource {
    proc_root: PathBuf,
    os_release: PathBuf,
    pacer: CpuPacer,
}

impl ProcfsSource {
    pub fn new(cpu_window: Duration) -> Self {
        Self::with_paths("/proc", "/etc/os-release", cpu_window)
    }

    /// Point the source at alternate files (fixtures, chroots).
    pub fn with_paths(
        proc_root: impl Into<PathBuf>,
        os_release: impl Into<PathBuf>,
        cpu_window: Duration,
    ) -> Self {
        Self {
            proc_root: proc_root.into(),
            os_release: os_release.into(),
            pacer: CpuPacer::new(cpu_window),
        }
    }

    fn read(&self, rel: &str) -> Result<String, CounterError> {
        let path = self.proc_root.join(rel);
        std::fs::read_to_string(&path)
            .map_err(|e| CounterError::new(counter_name(rel), format!("{}: {}", path.display(), e)))
    }
}

fn counter_name(rel: &str) -> &'static str {
    match rel {
        "stat" => "cpu_times",
        "net/dev" => "net_dev",
        "meminfo" => "meminfo",
        "cpuinfo" => "cpuinfo",
        "uptime" => "uptime",
        "self/mounts" => "mounts",
        _ => "procfs",
    }
}

impl CounterSource for ProcfsSource {
    fn sample(&mut self) -> Result<RawSample, CounterError> {
        self.pacer.pace();
        let stat = self.read("stat")?;
        let taken_at = Instant::now();
        let cpu = parse_cpu_times(&stat)
            .ok_or_else(|| CounterError::new("cpu_times", "no aggregate cpu line"))?;
        let net = parse_net_dev(&self.read("net/dev")?);
        Ok(RawSample { cpu, net, taken_at })
    }

    fn memory(&mut self) -> Result<MemoryReading, CounterError> {
        parse_meminfo(&self.read("meminfo")?)
    }

    fn process_count(&mut self) -> Result<u64, CounterError> {
        let entries = std::fs::read_dir(&self.proc_root)
            .map_err(|e| CounterError::new("process_count", e))?;
        Ok(entries
            .filter_map(Result::ok)
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            })
            .count() as u64)
    }

    fn uptime_secs(&mut self) -> Result<u64, CounterError> {
        parse_uptime(&self.read("uptime")?)
    }

    fn static_info(&mut self) -> Result<CpuIdentity, CounterError> {
        let fallback_count = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);
        Ok(parse_cpuinfo(&self.read("cpuinfo")?, fallback_count))
    }

    fn disk_list(&mut self) -> Result<Vec<DiskReading>, CounterError> {
        let mounts = parse_mounts(&self.read("self/mounts")?);
        let mut seen = HashSet::new();
        let mut disks = Vec::new();
        for m in mounts {
            if is_excluded_mount(&m.fs_type, &m.mount) || !seen.insert(m.mount.clone()) {
                continue;
            }
            match fs_usage(Path::new(&m.mount)) {
                Ok((total, used)) if total > 0 => disks.push(DiskReading {
                    mount: m.mount,
                    fs_type: m.fs_type,
                    total,
                    used,
                }),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(mount = %m.mount, error = %e, "statvfs failed; skipping mount");
                }
            }
        }
        Ok(disks)
    }

    fn os_name(&mut self) -> String {
        std::fs::read_to_string(&self.os_release)
            .ok()
            .and_then(|s| parse_os_release(&s))
            .unwrap_or_else(|| {
                let kernel = std::fs::read_to_string(self.proc_root.join("sys/kernel/osrelease"))
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
                format!("Linux {kernel}").trim_end().to_string()
            })
    }
}

/// Total and used bytes the way `df` reports them.
fn fs_usage(path: &Path) -> nix::Result<(u64, u64)> {
    let st = nix::sys::statvfs::statvfs(path)?;
    let frag = st.fragment_size() as u64;
    let total = (st.blocks() as u64).saturating_mul(frag);
    let free = (st.blocks_free() as u64).saturating_mul(frag);
    Ok((total, total.saturating_sub(free)))
}

/// Aggregate `cpu ` line of /proc/stat. Columns missing on older kernels read as 0.
pub(crate) fn parse_cpu_times(stat: &str) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let mut cols = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse::<u64>().unwrap_or(0));
    let mut next = || cols.next().unwrap_or(0);
    Some(CpuTimes {
        user: next(),
        nice: next(),
        system: next(),
        idle: next(),
        iowait: next(),
        irq: next(),
        softirq: next(),
        steal: next(),
        guest: next(),
        guest_nice: next(),
    })
}

/// Sum of every interface in /proc/net/dev (loopback included).
pub(crate) fn parse_net_dev(content: &str) -> NetCounters {
    let mut totals = NetCounters::default();
    for line in content.lines() {
        let Some((_, data)) = line.split_once(':') else {
            continue;
        };
        let cols: Vec<u64> = data
            .split_whitespace()
            .map(|v| v.parse().unwrap_or(0))
            .collect();
        if cols.len() < 10 {
            continue;
        }
        totals.bytes_recv = totals.bytes_recv.saturating_add(cols[0]);
        totals.bytes_sent = totals.bytes_sent.saturating_add(cols[8]);
        totals.packets_sent = totals.packets_sent.saturating_add(cols[9]);
    }
    totals
}

/// Used memory is `MemTotal - MemAvailable` (MemFree on kernels without MemAvailable).
pub(crate) fn parse_meminfo(content: &str) -> Result<MemoryReading, CounterError> {
    let mut total = None;
    let mut available = None;
    let mut free = None;
    let mut swap_total = 0u64;
    let mut swap_free = 0u64;
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(kb) = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };
        let bytes = kb.saturating_mul(1024);
        match key.trim() {
            "MemTotal" => total = Some(bytes),
            "MemAvailable" => available = Some(bytes),
            "MemFree" => free = Some(bytes),
            "SwapTotal" => swap_total = bytes,
            "SwapFree" => swap_free = bytes,
            _ => {}
        }
    }
    let mem_total = total.ok_or_else(|| CounterError::new("meminfo", "MemTotal missing"))?;
    let mem_free = available.or(free).unwrap_or(0);
    Ok(MemoryReading {
        mem_total,
        mem_used: mem_total.saturating_sub(mem_free),
        swap_total,
        swap_used: swap_total.saturating_sub(swap_free),
    })
}

pub(crate) fn parse_uptime(content: &str) -> Result<u64, CounterError> {
    content
        .split_whitespace()
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
        .ok_or_else(|| CounterError::new("uptime", "unparseable /proc/uptime"))
}

/// First `model name` and `cpu MHz` entries, logical count from `processor` lines.
pub(crate) fn parse_cpuinfo(content: &str, fallback_count: u32) -> CpuIdentity {
    let value = |line: &str| line.split_once(':').map(|(_, v)| v.trim().to_string());
    let mut model = None;
    let mut freq_ghz = None;
    let mut count = 0u32;
    for line in content.lines() {
        if line.starts_with("processor") {
            count += 1;
        } else if model.is_none() && line.starts_with("model name") {
            model = value(line).filter(|s| !s.is_empty());
        } else if freq_ghz.is_none() && line.starts_with("cpu MHz") {
            freq_ghz = value(line)
                .and_then(|v| v.parse::<f64>().ok())
                .map(|mhz| round_to(mhz / 1000.0, 3));
        }
    }
    CpuIdentity {
        model: model.unwrap_or_else(|| "Unknown".into()),
        count: if count > 0 { count } else { fallback_count },
        freq_ghz,
    }
}

/// `NAME VERSION` from os-release, e.g. "Ubuntu 22.04.4 LTS (Jammy Jellyfish)".
pub(crate) fn parse_os_release(content: &str) -> Option<String> {
    let field = |key: &str| {
        content.lines().find_map(|l| {
            l.strip_prefix(key)
                .and_then(|v| v.strip_prefix('='))
                .map(|v| v.trim().trim_matches('"').to_string())
        })
    };
    let name = field("NAME").filter(|n| !n.is_empty())?;
    let version = field("VERSION").unwrap_or_default();
    Some(format!("{name} {version}").trim_end().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MountEntry {
    pub mount: String,
    pub fs_type: String,
}

/// Mount table rows. Mount paths use octal escapes for whitespace (`\040`).
pub(crate) fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let _device = cols.next()?;
            let mount = unescape_mount(cols.next()?);
            let fs_type = cols.next()?.to_string();
            Some(MountEntry { mount, fs_type })
        })
        .collect()
}

fn unescape_mount(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
            && let Ok(code) = u8::from_str_radix(&raw[i + 1..i + 4], 8)
        {
            out.push(code);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
