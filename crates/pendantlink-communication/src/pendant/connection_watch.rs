//! Peer liveness tracking
//!
//! Holds the `last_seen` timestamp as milliseconds since the watcher's origin
//! so the notifier thread can read it without locking.

use pendantlink_core::Clock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Liveness configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionWatchConfig {
    /// Silence longer than this ends the session
    pub timeout_ms: u64,
}

impl Default for ConnectionWatchConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Liveness state of the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionWatchState {
    /// A liveness signal arrived within the timeout
    Healthy,
    /// The timeout elapsed without a liveness signal
    Lost,
}

/// Tracks the last time the peer proved it was present
#[derive(Debug)]
pub struct ConnectionWatcher {
    config: ConnectionWatchConfig,
    origin: Instant,
    last_seen: AtomicU64,
}

impl ConnectionWatcher {
    /// Create a watcher whose origin is `now`; the peer counts as just seen
    pub fn new(config: ConnectionWatchConfig, now: Instant) -> Self {
        Self {
            config,
            origin: now,
            last_seen: AtomicU64::new(0),
        }
    }

    fn millis_at(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.origin).as_millis() as u64
    }

    /// Record a liveness signal at `now`
    pub fn heartbeat(&self, now: Instant) {
        self.last_seen.store(self.millis_at(now), Ordering::Release);
    }

    /// Record a liveness signal using `clock`
    pub fn heartbeat_with(&self, clock: &dyn Clock) {
        self.heartbeat(clock.now());
    }

    /// Milliseconds since the origin at which the peer was last seen
    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen.load(Ordering::Acquire)
    }

    /// Milliseconds of silence as of `now`
    pub fn time_since_heartbeat(&self, now: Instant) -> u64 {
        self.millis_at(now).saturating_sub(self.last_seen_ms())
    }

    /// Check if the silence exceeds the timeout
    pub fn is_expired(&self, now: Instant) -> bool {
        self.time_since_heartbeat(now) > self.config.timeout_ms
    }

    /// Current state as of `now`
    pub fn state(&self, now: Instant) -> ConnectionWatchState {
        if self.is_expired(now) {
            ConnectionWatchState::Lost
        } else {
            ConnectionWatchState::Healthy
        }
    }
}
