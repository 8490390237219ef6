// Outbound schema pushed to the collector

use serde::{Deserialize, Serialize};

/// Internal field name -> wire name. The serde attributes on [`Snapshot`]
/// must agree with this table; `snapshot_keys_match_field_table` enforces it.
pub const FIELD_NAMES: &[(&str, &str)] = &[
    ("cpu_usage", "cpuUsage"),
    ("cpu_model", "cpuModel"),
    ("cpu_count", "cpuCount"),
    ("cpu_freq", "cpuFreq"),
    ("mem_total", "memTotal"),
    ("mem_used", "memUsed"),
    ("mem_percent", "memPercent"),
    ("swap_total", "swapTotal"),
    ("swap_used", "swapUsed"),
    ("swap_percent", "swapPercent"),
    ("network_sent", "networkSent"),
    ("network_received", "networkReceived"),
    ("network_pocket_sent", "networkPocketSent"),
    ("process_count", "processCount"),
    ("disks", "disks"),
    ("uptime", "uptime"),
    ("sent_speed", "sentSpeed"),
    ("recv_speed", "recvSpeed"),
    ("os", "os"),
    ("secret_key", "secretKey"),
    ("last_update", "lastUpdate"),
];

/// `[mount, total, used, used_percent]`, serialized as a JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskEntry(pub String, pub String, pub String, pub f64);

/// One fully formatted telemetry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "cpuUsage")]
    pub cpu_usage: f64,
    #[serde(rename = "cpuModel")]
    pub cpu_model: String,
    #[serde(rename = "cpuCount")]
    pub cpu_count: Option<u32>,
    #[serde(rename = "cpuFreq")]
    pub cpu_freq: Option<f64>,
    #[serde(rename = "memTotal")]
    pub mem_total: String,
    #[serde(rename = "memUsed")]
    pub mem_used: String,
    #[serde(rename = "memPercent")]
    pub mem_percent: Option<f64>,
    #[serde(rename = "swapTotal")]
    pub swap_total: String,
    #[serde(rename = "swapUsed")]
    pub swap_used: String,
    #[serde(rename = "swapPercent")]
    pub swap_percent: Option<f64>,
    #[serde(rename = "networkSent")]
    pub network_sent: String,
    #[serde(rename = "networkReceived")]
    pub network_received: String,
    /// Packets sent. The collector's key really is spelled "Pocket".
    #[serde(rename = "networkPocketSent")]
    pub network_pocket_sent: Option<u64>,
    #[serde(rename = "processCount")]
    pub process_count: Option<u64>,
    #[serde(rename = "disks")]
    pub disks: Vec<DiskEntry>,
    #[serde(rename = "uptime")]
    pub uptime: String,
    #[serde(rename = "sentSpeed")]
    pub sent_speed: String,
    #[serde(rename = "recvSpeed")]
    pub recv_speed: String,
    #[serde(rename = "os")]
    pub os: String,
    #[serde(rename = "secretKey")]
    pub secret_key: String,
    #[serde(rename = "lastUpdate")]
    pub last_update: String,
}
