//! Coordinator and worker settings. Durations are stored in milliseconds so a
//! JSON config file stays flat.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use pegsol_engine::SearchConfig;
use serde::{Deserialize, Serialize};

use crate::wire::DEFAULT_PORT;

fn any_addr(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// How hard to try reaching a peer at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 60,
            interval_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = millis(interval);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Where worker results arrive.
    pub listen: SocketAddr,
    /// Longest wait for outstanding worker results in one evaluation.
    pub result_timeout_ms: u64,
    /// Connect and read timeout for individual sockets.
    pub io_timeout_ms: u64,
    pub retry: RetryPolicy,
    pub search: SearchConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            listen: any_addr(DEFAULT_PORT),
            result_timeout_ms: 180_000,
            io_timeout_ms: 30_000,
            retry: RetryPolicy::default(),
            search: SearchConfig::default(),
        }
    }
}

impl ClusterConfig {
    pub fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    pub fn with_result_timeout(mut self, timeout: Duration) -> Self {
        self.result_timeout_ms = millis(timeout);
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout_ms = millis(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Where the coordinator's control connection is accepted.
    pub listen: SocketAddr,
    /// Results go to the coordinator's address on this port.
    pub reply_port: u16,
    pub io_timeout_ms: u64,
    pub search: SearchConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            listen: any_addr(DEFAULT_PORT),
            reply_port: DEFAULT_PORT,
            io_timeout_ms: 30_000,
            search: SearchConfig::default(),
        }
    }
}

impl WorkerConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    pub fn with_reply_port(mut self, port: u16) -> Self {
        self.reply_port = port;
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }
}
