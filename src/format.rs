// Human-readable formatting for byte sizes, durations and rates

const SIZE_UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Greedy breakdown order for uptime strings.
const DURATION_UNITS: [(&str, u64); 4] = [
    ("days", 86_400),
    ("hours", 3_600),
    ("minutes", 60),
    ("seconds", 1),
];

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Shortest decimal text for `value`, always with a fractional part
/// (`1.0`, `12.25`), which is how the collector has always received floats.
pub fn decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Divide by 1024 through B -> KB -> MB -> GB -> TB, stopping at the first
/// unit below 1024. Bytes stay integral; larger units keep two decimals.
pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    for (i, unit) in SIZE_UNITS.iter().enumerate() {
        value /= 1024.0;
        if value < 1024.0 || i == SIZE_UNITS.len() - 1 {
            return format!("{} {unit}", decimal(round_to(value, 2)));
        }
    }
    unreachable!("last size unit always returns")
}

/// Space-joined `<count><unit>` terms, largest unit first, zero terms omitted.
/// Anything under one second is `"0s"`.
pub fn human_duration(secs: u64) -> String {
    let mut remaining = secs;
    let mut terms = Vec::new();
    for (name, unit) in DURATION_UNITS {
        if remaining >= unit {
            terms.push(format!("{}{name}", remaining / unit));
            remaining %= unit;
        }
    }
    if terms.is_empty() {
        "0s".to_string()
    } else {
        terms.join(" ")
    }
}

/// `"<kb> KB/s"` with the rate already rounded by the estimator.
pub fn human_rate(kbps: f64) -> String {
    format!("{} KB/s", decimal(kbps))
}
