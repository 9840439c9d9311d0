//! Per-request queue wait derivation.
//!
//! The wait a request may spend queued at a full gate comes from its own
//! `timeout` argument, capped by the configured max query duration, then
//! capped again by the configured max queue duration. A caller's hint can
//! only shorten the wait, never lengthen it past the queue ceiling.

use std::time::Duration;

use crate::config::SearchConfig;

/// Name of the query argument carrying the caller's deadline hint.
pub const TIMEOUT_ARG: &str = "timeout";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePolicy {
    queue_ceiling: Duration,
    max_query_duration: Duration,
}

impl QueuePolicy {
    pub fn new(queue_ceiling: Duration, max_query_duration: Duration) -> Self {
        Self {
            queue_ceiling,
            max_query_duration,
        }
    }

    pub fn from_config(search: &SearchConfig) -> Self {
        Self::new(search.max_queue_duration(), search.max_query_duration())
    }

    pub fn queue_ceiling(&self) -> Duration {
        self.queue_ceiling
    }

    /// Effective query duration for a request carrying `hint`.
    pub fn query_duration(&self, hint: Option<Duration>) -> Duration {
        match hint {
            Some(d) => d.min(self.max_query_duration),
            None => self.max_query_duration,
        }
    }

    /// How long a request carrying `hint` may wait for a slot.
    pub fn max_wait(&self, hint: Option<Duration>) -> Duration {
        self.query_duration(hint).min(self.queue_ceiling)
    }

    /// Derive the wait from a raw query string (`a=b&timeout=5s`).
    pub fn max_wait_for_query(&self, query: Option<&str>) -> Duration {
        self.max_wait(query.and_then(timeout_hint))
    }
}

/// Extract and parse the `timeout` argument from a query string.
pub fn timeout_hint(query: &str) -> Option<Duration> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == TIMEOUT_ARG)
        .and_then(|(_, value)| parse_duration(&value))
}

/// Parse `1.5` (seconds), `500ms`, `30s`, `2m` or `1h`.
/// Negative, empty and malformed values yield `None`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (number, scale) = if let Some(n) = raw.strip_suffix("ms") {
        (n, 0.001)
    } else if let Some(n) = raw.strip_suffix('s') {
        (n, 1.0)
    } else if let Some(n) = raw.strip_suffix('m') {
        (n, 60.0)
    } else if let Some(n) = raw.strip_suffix('h') {
        (n, 3600.0)
    } else {
        (raw, 1.0)
    };

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(value * scale).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> QueuePolicy {
        QueuePolicy::new(Duration::from_secs(10), Duration::from_secs(30))
    }

    #[test]
    fn no_hint_waits_for_the_queue_ceiling() {
        assert_eq!(policy().max_wait(None), Duration::from_secs(10));
    }

    #[test]
    fn hint_can_lower_the_wait() {
        assert_eq!(
            policy().max_wait(Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn hint_never_raises_the_ceiling() {
        assert_eq!(
            policy().max_wait(Some(Duration::from_secs(20))),
            Duration::from_secs(10)
        );
        assert_eq!(
            policy().max_wait(Some(Duration::from_secs(3600))),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn query_duration_is_capped_by_max_query_duration() {
        let p = QueuePolicy::new(Duration::from_secs(60), Duration::from_secs(30));
        assert_eq!(
            p.query_duration(Some(Duration::from_secs(45))),
            Duration::from_secs(30)
        );
        assert_eq!(
            p.max_wait(Some(Duration::from_secs(45))),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn zero_ceiling_never_waits() {
        let p = QueuePolicy::new(Duration::ZERO, Duration::from_secs(30));
        assert_eq!(p.max_wait(Some(Duration::from_secs(5))), Duration::ZERO);
    }

    #[test]
    fn parses_duration_forms() {
        assert_eq!(parse_duration("1.5"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("-1"), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn reads_timeout_from_query_string() {
        let p = policy();
        assert_eq!(
            p.max_wait_for_query(Some("query=%7Bapp%3D%22x%22%7D&timeout=3s")),
            Duration::from_secs(3)
        );
        assert_eq!(
            p.max_wait_for_query(Some("timeout=bogus")),
            Duration::from_secs(10)
        );
        assert_eq!(p.max_wait_for_query(None), Duration::from_secs(10));
    }
}
