//! Stormo: a hybrid fan-out timeline engine for self-hosted microblogs.
//!
//! Posts are distributed to follower home timelines at publish time
//! (push) or parked in a per-publisher broadcast cache and merged at
//! read time (pull), chosen per publish by follower count. The layers
//! below follow that split: `domain` holds the records and drafts,
//! `application` the fan-out, assembly, and social services, `cache`
//! the in-process id-set stores, `realtime` the live event relay, and
//! `infra` the Postgres repositories and the HTTP surface.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod realtime;
