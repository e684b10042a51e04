//! Stormo timeline cache.
//!
//! Two keyed id-set caches back the hybrid fan-out engine:
//!
//! - **Home cache**: per-recipient post ids pushed at publish time for
//!   regular publishers.
//! - **Broadcast cache**: per-publisher post ids for high-fan-out
//!   publishers, merged into each follower's page at read time.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `stormo.toml`:
//!
//! ```toml
//! [timeline]
//! celebrity_threshold = 5000
//! ttl_seconds = 300
//! max_size = 800
//! # ... see config.rs for all options
//! ```

mod config;
mod store;

pub use config::CacheConfig;
pub use store::TimelineCache;
