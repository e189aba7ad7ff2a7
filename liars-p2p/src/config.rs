use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-endpoint swarm settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct P2pConfig {
    pub listen_multiaddrs: Vec<String>, // e.g. ["/ip4/127.0.0.1/tcp/41001"]
    pub bootstrap: Vec<String>,         // the other roster addresses, no /p2p suffix
    pub rendezvous: String,             // DHT provider key and gossip topic
    pub gossip_buffer: usize,
    pub idle_timeout_secs: u64,
    pub query_timeout_secs: u64,
}

impl P2pConfig {
    pub fn new(listen: impl Into<String>, rendezvous: impl Into<String>) -> Self {
        Self {
            listen_multiaddrs: vec![listen.into()],
            bootstrap: Vec::new(),
            rendezvous: rendezvous.into(),
            gossip_buffer: 1024,
            idle_timeout_secs: 60,
            query_timeout_secs: 5,
        }
    }

    pub fn with_bootstrap(mut self, bootstrap: Vec<String>) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Bounds for the rendezvous discovery loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
    pub backoff_multiplier: f64,
    pub max_interval_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            max_attempts: 30,
            backoff_multiplier: 1.5,
            max_interval_ms: 10_000,
        }
    }
}

impl DiscoveryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms.max(self.poll_interval_ms))
    }

    /// Wait before the round after one that waited `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let factor = if self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0 {
            self.backoff_multiplier
        } else {
            1.0
        };
        current.mul_f64(factor).min(self.max_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_then_caps() {
        let cfg = DiscoveryConfig {
            poll_interval_ms: 100,
            max_attempts: 5,
            backoff_multiplier: 2.0,
            max_interval_ms: 300,
        };
        let first = cfg.poll_interval();
        let second = cfg.next_interval(first);
        let third = cfg.next_interval(second);

        assert_eq!(second, Duration::from_millis(200));
        assert_eq!(third, Duration::from_millis(300));
        assert_eq!(cfg.next_interval(third), Duration::from_millis(300));
    }

    #[test]
    fn test_shrinking_multiplier_is_ignored() {
        let cfg = DiscoveryConfig {
            backoff_multiplier: 0.5,
            ..DiscoveryConfig::default()
        };
        assert_eq!(cfg.next_interval(cfg.poll_interval()), cfg.poll_interval());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: DiscoveryConfig = serde_json::from_str(r#"{"max_attempts": 3}"#).unwrap();
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.poll_interval_ms, 2000);
    }
}
