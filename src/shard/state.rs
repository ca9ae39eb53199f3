//! Shard state tracking
//!
//! Health and activity counters of the bot's shard, shared with the
//! health endpoints.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Health status for the shard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardHealth {
    /// Shard is connecting
    Connecting,
    /// Shard is ready and receiving events
    Ready,
    /// Shard is disconnected, reconnect pending
    Disconnected,
    /// Shard encountered a fatal error
    Dead,
}

impl ShardHealth {
    /// Returns true if the shard is ready to receive events
    pub fn is_ready(&self) -> bool {
        matches!(self, ShardHealth::Ready)
    }
}

#[derive(Debug)]
struct Timeline {
    health: ShardHealth,
    last_heartbeat: Option<Instant>,
    connected_at: Option<Instant>,
}

#[derive(Debug)]
struct ShardStateInner {
    timeline: RwLock<Timeline>,
    guilds: AtomicU64,
    events_received: AtomicU64,
    members_joined: AtomicU64,
    commands_handled: AtomicU64,
}

/// Shared shard state; cheap to clone
#[derive(Debug, Clone)]
pub struct ShardState {
    inner: Arc<ShardStateInner>,
}

impl Default for ShardState {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ShardStateInner {
                timeline: RwLock::new(Timeline {
                    health: ShardHealth::Connecting,
                    last_heartbeat: None,
                    connected_at: None,
                }),
                guilds: AtomicU64::new(0),
                events_received: AtomicU64::new(0),
                members_joined: AtomicU64::new(0),
                commands_handled: AtomicU64::new(0),
            }),
        }
    }

    fn with_timeline<R>(&self, f: impl FnOnce(&mut Timeline) -> R) -> R {
        let mut timeline = match self.inner.timeline.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut timeline)
    }

    /// Update shard health
    pub fn set_health(&self, health: ShardHealth) {
        self.with_timeline(|t| {
            t.health = health;
            if health == ShardHealth::Ready && t.connected_at.is_none() {
                t.connected_at = Some(Instant::now());
            }
        });
    }

    pub fn health(&self) -> ShardHealth {
        self.with_timeline(|t| t.health)
    }

    pub fn is_ready(&self) -> bool {
        self.health().is_ready()
    }

    /// Seconds since the shard first became ready
    pub fn uptime_secs(&self) -> Option<u64> {
        self.with_timeline(|t| t.connected_at.map(|at| at.elapsed().as_secs()))
    }

    /// Seconds since the last heartbeat acknowledgement
    pub fn heartbeat_age_secs(&self) -> Option<u64> {
        self.with_timeline(|t| t.last_heartbeat.map(|at| at.elapsed().as_secs()))
    }

    pub fn record_heartbeat(&self) {
        self.with_timeline(|t| t.last_heartbeat = Some(Instant::now()));
    }

    pub fn set_guilds(&self, count: u64) {
        self.inner.guilds.store(count, Ordering::Relaxed);
    }

    pub fn guilds(&self) -> u64 {
        self.inner.guilds.load(Ordering::Relaxed)
    }

    pub fn record_event(&self) {
        self.inner.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_received(&self) -> u64 {
        self.inner.events_received.load(Ordering::Relaxed)
    }

    pub fn record_member_join(&self) {
        self.inner.members_joined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn members_joined(&self) -> u64 {
        self.inner.members_joined.load(Ordering::Relaxed)
    }

    pub fn record_command(&self) {
        self.inner.commands_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn commands_handled(&self) -> u64 {
        self.inner.commands_handled.load(Ordering::Relaxed)
    }
}
