// Platform counter sources: raw OS reads behind one interface

#[cfg(target_os = "linux")]
mod linux;
mod sysinfo_source;

#[cfg(target_os = "linux")]
pub use linux::ProcfsSource;
pub use sysinfo_source::SysinfoSource;

use crate::error::CounterError;
use crate::models::{CpuIdentity, DiskReading, MemoryReading, RawSample};
use std::path::Path;
use std::time::{Duration, Instant};

/// Filesystem types that never represent user storage.
pub const VIRTUAL_FS_TYPES: &[&str] = &["tmpfs", "devtmpfs", "squashfs", "overlay"];

/// Mount points under these paths belong to the system, not the user.
pub const SYSTEM_MOUNT_PREFIXES: &[&str] = &["/snap", "/run", "/sys", "/dev/shm", "/boot/efi"];

/// Reads raw OS counters. Every read may fail independently with
/// [`CounterError`]; callers degrade per field instead of aborting.
pub trait CounterSource: Send {
    /// Cumulative CPU and network counters.
    ///
    /// Blocks for at most the configured CPU window, and only when the
    /// previous call was more recent than that window, so two samples are
    /// never taken close enough together to produce a degenerate delta.
    fn sample(&mut self) -> Result<RawSample, CounterError>;

    fn memory(&mut self) -> Result<MemoryReading, CounterError>;

    fn process_count(&mut self) -> Result<u64, CounterError>;

    fn uptime_secs(&mut self) -> Result<u64, CounterError>;

    /// CPU model, logical count and frequency.
    fn static_info(&mut self) -> Result<CpuIdentity, CounterError>;

    /// Real, user-relevant filesystems only.
    fn disk_list(&mut self) -> Result<Vec<DiskReading>, CounterError>;

    /// Human-facing OS name; never fails, falls back to a generic label.
    fn os_name(&mut self) -> String;
}

/// Counter source for the running platform: `/proc` on Linux, sysinfo elsewhere.
pub fn platform_source(cpu_window: Duration) -> Box<dyn CounterSource> {
    #[cfg(target_os = "linux")]
    {
        Box::new(ProcfsSource::new(cpu_window))
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(SysinfoSource::new(cpu_window))
    }
}

/// Disk exclusion policy for Unix mount tables. Prefixes match whole path
/// components, so `/run` excludes `/run/user/1000` but not `/runtime`.
pub fn is_excluded_mount(fs_type: &str, mount: &str) -> bool {
    if VIRTUAL_FS_TYPES.contains(&fs_type) {
        return true;
    }
    let mount = Path::new(mount);
    SYSTEM_MOUNT_PREFIXES
        .iter()
        .any(|prefix| mount.starts_with(prefix))
}

/// Enforces a minimum gap between consecutive CPU reads.
#[derive(Debug)]
pub(crate) struct CpuPacer {
    window: Duration,
    last_read: Option<Instant>,
}

impl CpuPacer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            last_read: None,
        }
    }

    /// Sleeps out whatever remains of the window since the last read, then
    /// marks a new read. Returns how long it slept.
    pub(crate) fn pace(&mut self) -> Duration {
        let slept = match self.last_read {
            Some(last) => {
                let since = last.elapsed();
                if since < self.window {
                    let rest = self.window - since;
                    std::thread::sleep(rest);
                    rest
                } else {
                    Duration::ZERO
                }
            }
            None => Duration::ZERO,
        };
        self.last_read = Some(Instant::now());
        slept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_types_are_excluded() {
        for fs in ["tmpfs", "devtmpfs", "squashfs", "overlay"] {
            assert!(is_excluded_mount(fs, "/data"), "{fs} should be excluded");
        }
    }

    #[test]
    fn system_prefixes_are_excluded() {
        for mount in [
            "/snap/core/123",
            "/run",
            "/run/user/1000",
            "/sys/fs/cgroup",
            "/dev/shm",
            "/boot/efi",
        ] {
            assert!(is_excluded_mount("ext4", mount), "{mount} should be excluded");
        }
    }

    #[test]
    fn normal_mounts_are_kept() {
        for mount in ["/", "/home", "/boot", "/mnt/data", "/runtime", "/snapshots"] {
            assert!(!is_excluded_mount("ext4", mount), "{mount} should be kept");
        }
        assert!(!is_excluded_mount("xfs", "/srv"));
    }

    #[test]
    fn pacer_first_read_does_not_sleep() {
        let mut pacer = CpuPacer::new(Duration::from_millis(50));
        assert_eq!(pacer.pace(), Duration::ZERO);
    }

    #[test]
    fn pacer_enforces_window() {
        let mut pacer = CpuPacer::new(Duration::from_millis(30));
        pacer.pace();
        let start = Instant::now();
        let slept = pacer.pace();
        assert!(slept > Duration::ZERO);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn pacer_skips_sleep_after_long_gap() {
        let mut pacer = CpuPacer::new(Duration::from_millis(5));
        pacer.pace();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(pacer.pace(), Duration::ZERO);
    }
}
