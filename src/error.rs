// Error taxonomy for the agent: per-metric, transport, rejection, configuration.

use thiserror::Error;

/// A single OS counter could not be read. Never fatal; the builder keeps the
/// last good value for the affected field or falls back to a sentinel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("counter unavailable: {counter}: {reason}")]
pub struct CounterError {
    pub counter: &'static str,
    pub reason: String,
}

impl CounterError {
    pub fn new(counter: &'static str, reason: impl ToString) -> Self {
        Self {
            counter,
            reason: reason.to_string(),
        }
    }
}

/// Outcome of a failed push to the collector.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Collector unreachable, timed out, or answered with something that is
    /// not the expected JSON envelope. Retried on the next tick.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Collector answered with a non-success application status. Fatal.
    #[error("collector rejected payload (code {code}): {message}")]
    Rejected { code: i64, message: String },
}

impl From<reqwest::Error> for SinkError {
    fn from(e: reqwest::Error) -> Self {
        SinkError::Transport(e.to_string())
    }
}

/// Credentials file problems. Recovered by prompting, fatal only when the
/// prompt itself cannot produce a valid file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("credentials file not found: {0}")]
    Missing(String),
    #[error("invalid credentials: {0}")]
    Invalid(String),
    #[error("credentials prompt aborted: {0}")]
    PromptAborted(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
