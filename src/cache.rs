// Time-bounded cache for metrics that are expensive or rarely change

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    refreshed_at: Instant,
}

/// One cached field. The first read always refreshes; later reads reuse the
/// value while `now - refreshed_at < ttl`. A failed refresh leaves the last
/// good value and its timestamp untouched, so the next read retries.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    ttl: Option<Duration>,
    entry: Option<Entry<T>>,
}

impl<T: Clone> Cached<T> {
    /// Refreshed once, then kept for the life of the process.
    pub fn forever() -> Self {
        Self {
            ttl: None,
            entry: None,
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            entry: None,
        }
    }

    pub fn get_or_refresh<E>(&mut self, refresh: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        self.get_or_refresh_at(Instant::now(), refresh)
    }

    pub fn get_or_refresh_at<E>(
        &mut self,
        now: Instant,
        refresh: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        if let Some(entry) = &self.entry
            && self.is_fresh(entry, now)
        {
            return Ok(entry.value.clone());
        }
        let value = refresh()?;
        self.entry = Some(Entry {
            value: value.clone(),
            refreshed_at: now,
        });
        Ok(value)
    }

    /// Last successfully refreshed value, however old.
    pub fn last_good(&self) -> Option<&T> {
        self.entry.as_ref().map(|e| &e.value)
    }

    #[cfg(test)]
    pub(crate) fn refreshed_at(&self) -> Option<Instant> {
        self.entry.as_ref().map(|e| e.refreshed_at)
    }

    fn is_fresh(&self, entry: &Entry<T>, now: Instant) -> bool {
        match self.ttl {
            None => true,
            Some(ttl) => now.saturating_duration_since(entry.refreshed_at) < ttl,
        }
    }
}
