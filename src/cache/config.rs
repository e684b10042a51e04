//! Cache configuration.
//!
//! Controls the home and broadcast timeline caches via `stormo.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CELEBRITY_THRESHOLD: i64 = 5000;
const DEFAULT_TTL_SECONDS: u64 = 300;
const DEFAULT_MAX_SIZE: usize = 800;
const DEFAULT_BROADCAST_WINDOW: usize = 200;
const DEFAULT_BROADCAST_TTL_MULTIPLIER: u32 = 2;
const DEFAULT_OVERFETCH: u32 = 50;

/// Cache configuration from `stormo.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Follower count at which a publisher switches to pull fan-out.
    pub celebrity_threshold: i64,
    /// Base TTL for home cache entries, in seconds.
    pub ttl_seconds: u64,
    /// Maximum ids retained per home cache entry.
    pub max_size: usize,
    /// Maximum ids retained per broadcast cache entry.
    pub broadcast_window: usize,
    /// Broadcast entries live this many times the base TTL.
    pub broadcast_ttl_multiplier: u32,
    /// Extra ids read past `limit` when assembling a home page.
    pub overfetch: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            celebrity_threshold: DEFAULT_CELEBRITY_THRESHOLD,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            max_size: DEFAULT_MAX_SIZE,
            broadcast_window: DEFAULT_BROADCAST_WINDOW,
            broadcast_ttl_multiplier: DEFAULT_BROADCAST_TTL_MULTIPLIER,
            overfetch: DEFAULT_OVERFETCH,
        }
    }
}

impl From<&crate::config::TimelineSettings> for CacheConfig {
    fn from(settings: &crate::config::TimelineSettings) -> Self {
        Self {
            celebrity_threshold: settings.celebrity_threshold,
            ttl_seconds: settings.ttl_seconds,
            max_size: settings.max_size,
            broadcast_window: settings.broadcast_window,
            broadcast_ttl_multiplier: settings.broadcast_ttl_multiplier,
            overfetch: settings.overfetch,
        }
    }
}

impl CacheConfig {
    /// TTL applied to a home entry when it is created or rebuilt.
    pub fn base_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// TTL applied to a broadcast entry on every write. Broadcast
    /// entries are shared by all of the publisher's followers, so they
    /// outlive the per-follower home entries.
    pub fn broadcast_ttl(&self) -> Duration {
        self.base_ttl() * self.broadcast_ttl_multiplier.max(1)
    }

    /// Returns the home entry bound as NonZeroUsize, clamping to 1 if zero.
    pub fn max_size_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_size).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the broadcast window as NonZeroUsize, clamping to 1 if zero.
    pub fn broadcast_window_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.broadcast_window).unwrap_or(NonZeroUsize::MIN)
    }
}
