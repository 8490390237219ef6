// Platform counter source against the host it runs on

use hostreport::counters::{is_excluded_mount, platform_source};
use hostreport::rates::RateEstimator;
use std::time::Duration;

#[test]
fn test_platform_source_reads_host_counters() {
    let mut source = platform_source(Duration::from_millis(50));

    let memory = source.memory().expect("memory");
    assert!(memory.mem_total > 0);
    assert!(memory.mem_used <= memory.mem_total);

    assert!(!source.os_name().is_empty());
    assert!(source.process_count().expect("process_count") > 0);

    let identity = source.static_info().expect("static_info");
    assert!(identity.count >= 1);
}

#[test]
fn test_consecutive_samples_give_bounded_rates() {
    let mut source = platform_source(Duration::from_millis(50));
    let mut estimator = RateEstimator::new();

    let first = source.sample().expect("first sample");
    assert_eq!(estimator.observe(first).cpu_usage_pct, 0.0);

    let second = source.sample().expect("second sample");
    // paced to the window, give or take the read itself
    assert!(second.taken_at.duration_since(first.taken_at) >= Duration::from_millis(40));
    let rates = estimator.observe(second);
    assert!((0.0..=100.0).contains(&rates.cpu_usage_pct));
    assert!(rates.net_send_kbps >= 0.0);
    assert!(rates.net_recv_kbps >= 0.0);
}

#[cfg(unix)]
#[test]
fn test_disk_list_skips_system_mounts() {
    let mut source = platform_source(Duration::from_millis(50));
    let Ok(disks) = source.disk_list() else {
        return; // Skip when the mount table is not readable
    };
    for disk in &disks {
        assert!(!is_excluded_mount(&disk.fs_type, &disk.mount), "{disk:?}");
        assert!(disk.total > 0);
    }
}
