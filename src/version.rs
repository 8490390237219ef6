// Agent identity from Cargo.toml: startup log line and HTTP User-Agent

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml).
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// `hostreport/<version>`.
pub fn agent_id() -> String {
    format!("{NAME}/{VERSION}")
}
