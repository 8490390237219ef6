// Agent configuration: collector credentials (key=value file) and optional TOML tuning.

use crate::error::ConfigError;
use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CREDENTIALS_FILE: &str = "config.txt";
pub const TUNING_FILE: &str = "hostreport.toml";

/// Keys asked for, in order, when the credentials file is unusable.
pub const CREDENTIAL_KEYS: [&str; 2] = ["api_address", "secret_key"];

/// Directory holding the agent's files: `HOSTREPORT_DIR`, else the executable's directory.
pub fn agent_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HOSTREPORT_DIR") {
        return PathBuf::from(dir);
    }
    std::env::current_exe()
        .ok()
        .and_then(|p| p.canonicalize().ok())
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_address: String,
    pub secret_key: String,
}

impl Credentials {
    /// Lenient parse: blank lines, `#` comments, unknown keys and lines without
    /// `=` are skipped. Only the first `=` splits, so values may contain `=`.
    pub fn parse(content: &str) -> Self {
        let mut creds = Credentials::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                "api_address" => creds.api_address = value.trim().to_string(),
                "secret_key" => creds.secret_key = value.trim().to_string(),
                _ => {}
            }
        }
        creds
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.is_empty() {
            return Err(ConfigError::Invalid("secret_key must be non-empty".into()));
        }
        if !self.api_address.starts_with("http") {
            return Err(ConfigError::Invalid(format!(
                "api_address must start with http, got {:?}",
                self.api_address
            )));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.display().to_string()));
        }
        let creds = Self::parse(&std::fs::read_to_string(path)?);
        creds.validate()?;
        Ok(creds)
    }

    pub fn render(&self) -> String {
        format!(
            "api_address={}\nsecret_key={}\n",
            self.api_address, self.secret_key
        )
    }
}

/// Ask for each credential key on `output`, one answer per line of `input`.
pub fn prompt_credentials(
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Credentials, ConfigError> {
    let mut answers = Vec::with_capacity(CREDENTIAL_KEYS.len());
    for key in CREDENTIAL_KEYS {
        writeln!(output, "Please enter {key}:")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(ConfigError::PromptAborted(format!("input closed before {key}")));
        }
        answers.push(line.trim().to_string());
    }
    let mut answers = answers.into_iter();
    Ok(Credentials {
        api_address: answers.next().unwrap_or_default(),
        secret_key: answers.next().unwrap_or_default(),
    })
}

/// Load credentials, prompting and rewriting the file until they validate.
/// Fails only when the prompt cannot be answered (closed input, I/O error).
pub fn load_or_prompt(
    path: &Path,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Credentials, ConfigError> {
    loop {
        match Credentials::load(path) {
            Ok(creds) => {
                tracing::info!(path = %path.display(), "Credentials check passed");
                return Ok(creds);
            }
            Err(e @ (ConfigError::Missing(_) | ConfigError::Invalid(_))) => {
                tracing::error!(error = %e, "Credentials unusable; prompting");
            }
            Err(e) => return Err(e),
        }
        let answered = prompt_credentials(input, output)?;
        std::fs::write(path, answered.render())?;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reporting: ReportingConfig,
    pub sampling: SamplingConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub interval_ms: u64,
    /// Reduced-activity mode: report on the slower cadence below.
    pub energy_saving: bool,
    pub energy_saving_interval_ms: u64,
    /// Offset of the `lastUpdate` wall-clock string.
    pub timestamp_utc_offset_hours: i32,
    /// How often to log push counters at INFO level.
    pub stats_log_interval_secs: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            energy_saving: true,
            energy_saving_interval_ms: default_energy_saving_interval_ms(),
            timestamp_utc_offset_hours: 8,
            stats_log_interval_secs: 300,
        }
    }
}

fn default_energy_saving_interval_ms() -> u64 {
    if cfg!(target_os = "linux") { 3000 } else { 2000 }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Minimum gap between two CPU counter reads.
    pub cpu_window_ms: u64,
    pub disk_ttl_secs: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            cpu_window_ms: 100,
            disk_ttl_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl AppConfig {
    /// `CONFIG_FILE` if set, else `hostreport.toml` in `dir`. A missing file means defaults.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dir.join(TUNING_FILE));
        if !path.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.reporting.interval_ms > 0,
            "reporting.interval_ms must be > 0, got {}",
            self.reporting.interval_ms
        );
        anyhow::ensure!(
            self.reporting.energy_saving_interval_ms > 0,
            "reporting.energy_saving_interval_ms must be > 0, got {}",
            self.reporting.energy_saving_interval_ms
        );
        anyhow::ensure!(
            (-23..=23).contains(&self.reporting.timestamp_utc_offset_hours),
            "reporting.timestamp_utc_offset_hours must be within -23..=23, got {}",
            self.reporting.timestamp_utc_offset_hours
        );
        anyhow::ensure!(
            self.reporting.stats_log_interval_secs > 0,
            "reporting.stats_log_interval_secs must be > 0, got {}",
            self.reporting.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.sampling.cpu_window_ms > 0,
            "sampling.cpu_window_ms must be > 0, got {}",
            self.sampling.cpu_window_ms
        );
        anyhow::ensure!(
            self.sampling.disk_ttl_secs > 0,
            "sampling.disk_ttl_secs must be > 0, got {}",
            self.sampling.disk_ttl_secs
        );
        anyhow::ensure!(
            self.sink.timeout_secs > 0,
            "sink.timeout_secs must be > 0, got {}",
            self.sink.timeout_secs
        );
        Ok(())
    }

    /// Cycle cadence, honouring the reduced-activity toggle.
    pub fn tick_interval(&self) -> Duration {
        if self.reporting.energy_saving {
            Duration::from_millis(self.reporting.energy_saving_interval_ms)
        } else {
            Duration::from_millis(self.reporting.interval_ms)
        }
    }

    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.reporting.timestamp_utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn cpu_window(&self) -> Duration {
        Duration::from_millis(self.sampling.cpu_window_ms)
    }

    pub fn disk_ttl(&self) -> Duration {
        Duration::from_secs(self.sampling.disk_ttl_secs)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_secs(self.sink.timeout_secs)
    }

    pub fn stats_log_interval(&self) -> Duration {
        Duration::from_secs(self.reporting.stats_log_interval_secs)
    }
}
