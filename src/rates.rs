// Rate estimation from pairs of cumulative-counter samples

use crate::format::round_to;
use crate::models::{RawSample, Rates};

/// CPU busy percent and network KB/s between two samples.
///
/// Counter resets and clock anomalies never produce a negative or NaN rate:
/// a non-positive CPU window yields 0%, a shrinking byte counter yields 0 KB/s,
/// and a zero elapsed time yields 0 KB/s.
pub fn rate(prev: &RawSample, curr: &RawSample) -> Rates {
    let total_delta = curr.cpu.total() as i128 - prev.cpu.total() as i128;
    let idle_delta = curr.cpu.idle as i128 - prev.cpu.idle as i128;
    let cpu_usage_pct = if total_delta <= 0 {
        0.0
    } else {
        let busy = (total_delta - idle_delta).clamp(0, total_delta);
        round_to(busy as f64 / total_delta as f64 * 100.0, 2)
    };

    let elapsed = curr
        .taken_at
        .saturating_duration_since(prev.taken_at)
        .as_secs_f64();
    let kbps = |before: u64, after: u64| {
        if elapsed <= 0.0 {
            return 0.0;
        }
        round_to(after.saturating_sub(before) as f64 / elapsed / 1024.0, 2)
    };

    Rates {
        cpu_usage_pct,
        net_send_kbps: kbps(prev.net.bytes_sent, curr.net.bytes_sent),
        net_recv_kbps: kbps(prev.net.bytes_recv, curr.net.bytes_recv),
    }
}

/// Holds the previous cycle's sample so each cycle can diff against it.
#[derive(Debug, Default)]
pub struct RateEstimator {
    previous: Option<RawSample>,
}

impl RateEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rates since the last observed sample; zero on the very first call.
    /// `curr` becomes the new baseline.
    pub fn observe(&mut self, curr: RawSample) -> Rates {
        let rates = match &self.previous {
            Some(prev) => rate(prev, &curr),
            None => Rates::default(),
        };
        self.previous = Some(curr);
        rates
    }

    #[cfg(test)]
    pub(crate) fn previous(&self) -> Option<&RawSample> {
        self.previous.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CpuTimes, NetCounters};
    use std::time::{Duration, Instant};

    fn sample(at: Instant, busy: u64, idle: u64, sent: u64, recv: u64) -> RawSample {
        RawSample {
            cpu: CpuTimes {
                user: busy,
                idle,
                ..Default::default()
            },
            net: NetCounters {
                bytes_sent: sent,
                bytes_recv: recv,
                packets_sent: 0,
            },
            taken_at: at,
        }
    }

    #[test]
    fn cpu_usage_from_deltas() {
        let t0 = Instant::now();
        let a = sample(t0, 100, 900, 0, 0);
        let b = sample(t0 + Duration::from_secs(1), 125, 975, 0, 0);
        assert_eq!(rate(&a, &b).cpu_usage_pct, 25.0);
    }

    #[test]
    fn cpu_usage_rounds_to_two_decimals() {
        let t0 = Instant::now();
        let a = sample(t0, 0, 0, 0, 0);
        let b = sample(t0 + Duration::from_secs(1), 1, 2, 0, 0);
        assert_eq!(rate(&a, &b).cpu_usage_pct, 33.33);
    }

    #[test]
    fn cpu_usage_stays_in_range() {
        let t0 = Instant::now();
        for (busy, idle) in [(0u64, 0u64), (0, 50), (50, 0), (7, 3), (1_000_000, 1)] {
            let a = sample(t0, 10, 10, 0, 0);
            let b = sample(t0 + Duration::from_secs(1), 10 + busy, 10 + idle, 0, 0);
            let pct = rate(&a, &b).cpu_usage_pct;
            assert!((0.0..=100.0).contains(&pct), "{pct} out of range");
        }
    }

    #[test]
    fn non_positive_cpu_window_is_zero() {
        let t0 = Instant::now();
        let a = sample(t0, 500, 500, 0, 0);
        let same = sample(t0 + Duration::from_secs(1), 500, 500, 0, 0);
        let reset = sample(t0 + Duration::from_secs(1), 10, 10, 0, 0);
        assert_eq!(rate(&a, &same).cpu_usage_pct, 0.0);
        assert_eq!(rate(&a, &reset).cpu_usage_pct, 0.0);
    }

    #[test]
    fn idle_reset_cannot_push_usage_over_100() {
        let t0 = Instant::now();
        let a = sample(t0, 100, 1000, 0, 0);
        let b = sample(t0 + Duration::from_secs(1), 1200, 0, 0, 0);
        assert_eq!(rate(&a, &b).cpu_usage_pct, 100.0);
    }

    #[test]
    fn network_rate_uses_measured_elapsed() {
        let t0 = Instant::now();
        let a = sample(t0, 0, 0, 0, 0);
        let b = sample(t0 + Duration::from_secs(2), 0, 0, 4096, 10_240);
        let r = rate(&a, &b);
        assert_eq!(r.net_send_kbps, 2.0);
        assert_eq!(r.net_recv_kbps, 5.0);

        let slow = sample(t0 + Duration::from_millis(4000), 0, 0, 4096, 10_240);
        assert_eq!(rate(&a, &slow).net_send_kbps, 1.0);
    }

    #[test]
    fn network_counter_reset_clamps_to_zero() {
        let t0 = Instant::now();
        let a = sample(t0, 0, 0, 1_000_000, 1_000_000);
        let b = sample(t0 + Duration::from_secs(1), 0, 0, 10, 20);
        let r = rate(&a, &b);
        assert_eq!(r.net_send_kbps, 0.0);
        assert_eq!(r.net_recv_kbps, 0.0);
    }

    #[test]
    fn zero_elapsed_is_zero_rate() {
        let t0 = Instant::now();
        let a = sample(t0, 0, 0, 0, 0);
        let b = sample(t0, 0, 0, 4096, 4096);
        assert_eq!(rate(&a, &b).net_send_kbps, 0.0);
    }

    #[test]
    fn estimator_first_observation_is_zero() {
        let t0 = Instant::now();
        let mut est = RateEstimator::new();
        assert!(est.previous().is_none());
        let first = est.observe(sample(t0, 10, 10, 1 << 20, 1 << 20));
        assert_eq!(first, Rates::default());
        let second = est.observe(sample(t0 + Duration::from_secs(1), 20, 20, (1 << 20) + 2048, 1 << 20));
        assert_eq!(second.cpu_usage_pct, 50.0);
        assert_eq!(second.net_send_kbps, 2.0);
        assert_eq!(est.previous().unwrap().cpu.user, 20);
    }
}
