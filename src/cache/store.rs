//! Cache storage implementation.
//!
//! Home: per-recipient id sets written by push fan-out.
//! Broadcast: per-publisher id sets written by pull fan-out.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::domain::types::{AccountId, PostId};

use super::config::CacheConfig;

/// One bounded, expiring id set.
///
/// Ids sort ascending in the tree; readers walk it in reverse so the
/// newest post comes out first. Expiry is checked lazily: an expired
/// entry reads as absent and is reset on the next write.
struct IdSetEntry {
    ids: BTreeSet<PostId>,
    expires_at: Instant,
}

impl IdSetEntry {
    fn fresh(ttl: Duration) -> Self {
        Self {
            ids: BTreeSet::new(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Insert and evict lowest ids past `bound`. Returns whether `id`
    /// is newly present after the write; an id older than everything in
    /// a full entry is trimmed straight back out and reports false.
    fn insert_bounded(&mut self, id: PostId, bound: usize) -> bool {
        let inserted = self.ids.insert(id);
        while self.ids.len() > bound {
            self.ids.pop_first();
        }
        inserted && self.ids.contains(&id)
    }

    fn newest(&self, count: usize) -> Vec<PostId> {
        self.ids.iter().rev().take(count).copied().collect()
    }
}

/// Process-scoped timeline cache shared by the fan-out engine (writes)
/// and the timeline assembler (reads).
///
/// Both maps are sharded; a single key's read-modify-write (insert plus
/// trim, or clear-on-expiry plus fill) happens under that key's entry
/// lock, so concurrent fan-outs to different recipients never contend
/// and concurrent fan-outs to the same recipient serialize per key.
pub struct TimelineCache {
    home: DashMap<AccountId, IdSetEntry>,
    broadcast: DashMap<AccountId, IdSetEntry>,
    base_ttl: Duration,
    broadcast_ttl: Duration,
    max_size: usize,
    broadcast_window: usize,
}

impl TimelineCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            home: DashMap::new(),
            broadcast: DashMap::new(),
            base_ttl: config.base_ttl(),
            broadcast_ttl: config.broadcast_ttl(),
            max_size: config.max_size_non_zero().get(),
            broadcast_window: config.broadcast_window_non_zero().get(),
        }
    }

    #[cfg(test)]
    fn with_ttls(
        max_size: usize,
        broadcast_window: usize,
        base_ttl: Duration,
        broadcast_ttl: Duration,
    ) -> Self {
        Self {
            home: DashMap::new(),
            broadcast: DashMap::new(),
            base_ttl,
            broadcast_ttl,
            max_size,
            broadcast_window,
        }
    }

    // ========================================================================
    // Home cache (per recipient)
    // ========================================================================

    /// Record a post id on a recipient's home entry. Creates the entry
    /// with the base TTL when absent; an existing entry keeps its
    /// remaining TTL, so steady pushes do not keep a timeline alive
    /// forever.
    pub fn push_home(&self, recipient: AccountId, id: PostId) -> bool {
        match self.home.entry(recipient) {
            Entry::Occupied(mut occupied) => {
                let now = Instant::now();
                let entry = occupied.get_mut();
                if entry.is_expired(now) {
                    entry.ids.clear();
                    entry.expires_at = now + self.base_ttl;
                }
                entry.insert_bounded(id, self.max_size)
            }
            Entry::Vacant(vacant) => {
                let mut entry = IdSetEntry::fresh(self.base_ttl);
                let inserted = entry.insert_bounded(id, self.max_size);
                vacant.insert(entry);
                inserted
            }
        }
    }

    pub fn remove_home(&self, recipient: AccountId, id: PostId) {
        if let Some(mut entry) = self.home.get_mut(&recipient) {
            entry.ids.remove(&id);
        }
    }

    /// Union rebuilt ids into a recipient's home entry and reset its
    /// TTL. Existing ids are kept: a fan-out racing the rebuild may
    /// already have pushed something newer than the store snapshot.
    pub fn fill_home(&self, recipient: AccountId, ids: &[PostId]) {
        let now = Instant::now();
        let mut entry = self
            .home
            .entry(recipient)
            .or_insert_with(|| IdSetEntry::fresh(self.base_ttl));
        if entry.is_expired(now) {
            entry.ids.clear();
        }
        entry.expires_at = now + self.base_ttl;
        for &id in ids {
            entry.insert_bounded(id, self.max_size);
        }
    }

    /// Newest `count` ids from a recipient's home entry, descending.
    /// An expired entry reads as empty and is dropped.
    pub fn read_home(&self, recipient: AccountId, count: usize) -> Vec<PostId> {
        Self::read_newest(&self.home, recipient, count)
    }

    /// Drop a recipient's home entry outright. Called when the follow
    /// graph changes; the next read rebuilds under the new graph.
    pub fn invalidate_home(&self, recipient: AccountId) {
        self.home.remove(&recipient);
    }

    /// Live cardinality of a recipient's home entry (0 when absent or
    /// expired).
    pub fn home_len(&self, recipient: AccountId) -> usize {
        Self::live_len(&self.home, recipient)
    }

    // ========================================================================
    // Broadcast cache (per publisher)
    // ========================================================================

    /// Record a post id on a publisher's broadcast entry and refresh
    /// its TTL. Unlike home entries, every write extends the lifetime:
    /// an active high-fan-out publisher keeps their shared window warm.
    pub fn push_broadcast(&self, publisher: AccountId, id: PostId) -> bool {
        match self.broadcast.entry(publisher) {
            Entry::Occupied(mut occupied) => {
                let now = Instant::now();
                let entry = occupied.get_mut();
                if entry.is_expired(now) {
                    entry.ids.clear();
                }
                entry.expires_at = now + self.broadcast_ttl;
                entry.insert_bounded(id, self.broadcast_window)
            }
            Entry::Vacant(vacant) => {
                let mut entry = IdSetEntry::fresh(self.broadcast_ttl);
                let inserted = entry.insert_bounded(id, self.broadcast_window);
                vacant.insert(entry);
                inserted
            }
        }
    }

    pub fn remove_broadcast(&self, publisher: AccountId, id: PostId) {
        if let Some(mut entry) = self.broadcast.get_mut(&publisher) {
            entry.ids.remove(&id);
        }
    }

    /// Newest `count` ids from a publisher's broadcast entry, descending.
    pub fn read_broadcast(&self, publisher: AccountId, count: usize) -> Vec<PostId> {
        Self::read_newest(&self.broadcast, publisher, count)
    }

    /// Live cardinality of a publisher's broadcast entry.
    pub fn broadcast_len(&self, publisher: AccountId) -> usize {
        Self::live_len(&self.broadcast, publisher)
    }

    // ========================================================================
    // Shared walkers
    // ========================================================================

    fn read_newest(
        map: &DashMap<AccountId, IdSetEntry>,
        key: AccountId,
        count: usize,
    ) -> Vec<PostId> {
        let now = Instant::now();
        {
            let Some(entry) = map.get(&key) else {
                return Vec::new();
            };
            if !entry.is_expired(now) {
                return entry.newest(count);
            }
        }
        // Expired: drop it outside the read guard so the next write
        // starts from a clean entry.
        map.remove_if(&key, |_, entry| entry.is_expired(Instant::now()));
        Vec::new()
    }

    fn live_len(map: &DashMap<AccountId, IdSetEntry>, key: AccountId) -> usize {
        match map.get(&key) {
            Some(entry) if !entry.is_expired(Instant::now()) => entry.ids.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_bounds(max_size: usize, broadcast_window: usize) -> TimelineCache {
        TimelineCache::with_ttls(
            max_size,
            broadcast_window,
            Duration::from_secs(60),
            Duration::from_secs(120),
        )
    }

    #[test]
    fn home_reads_newest_first() {
        let cache = cache_with_bounds(10, 10);
        for id in [3, 1, 2] {
            cache.push_home(7, id);
        }
        assert_eq!(cache.read_home(7, 10), vec![3, 2, 1]);
        assert_eq!(cache.read_home(7, 2), vec![3, 2]);
    }

    #[test]
    fn home_push_is_idempotent() {
        let cache = cache_with_bounds(10, 10);
        assert!(cache.push_home(7, 5));
        assert!(!cache.push_home(7, 5));
        assert_eq!(cache.home_len(7), 1);
    }

    #[test]
    fn home_entry_never_exceeds_bound() {
        let cache = cache_with_bounds(3, 10);
        for id in 1..=5 {
            cache.push_home(7, id);
            assert!(cache.home_len(7) <= 3);
        }
        // Lowest ids evicted first.
        assert_eq!(cache.read_home(7, 10), vec![5, 4, 3]);
    }

    #[test]
    fn pushing_an_id_older_than_a_full_entry_reports_false() {
        let cache = cache_with_bounds(2, 10);
        cache.push_home(7, 10);
        cache.push_home(7, 11);
        assert!(!cache.push_home(7, 1));
        assert_eq!(cache.read_home(7, 10), vec![11, 10]);
    }

    #[test]
    fn remove_home_drops_only_that_id() {
        let cache = cache_with_bounds(10, 10);
        cache.push_home(7, 1);
        cache.push_home(7, 2);
        cache.remove_home(7, 1);
        assert_eq!(cache.read_home(7, 10), vec![2]);
    }

    #[test]
    fn invalidate_home_drops_the_entry() {
        let cache = cache_with_bounds(10, 10);
        cache.push_home(7, 1);
        cache.invalidate_home(7);
        assert_eq!(cache.home_len(7), 0);
        assert!(cache.read_home(7, 10).is_empty());
    }

    #[test]
    fn fill_home_unions_and_trims() {
        let cache = cache_with_bounds(3, 10);
        cache.push_home(7, 9);
        cache.fill_home(7, &[1, 2, 3, 4]);
        // Union of {9} and {1,2,3,4}, trimmed to the 3 newest.
        assert_eq!(cache.read_home(7, 10), vec![9, 4, 3]);
    }

    #[test]
    fn broadcast_window_trims_oldest() {
        let cache = cache_with_bounds(10, 2);
        for id in [5, 6, 7] {
            cache.push_broadcast(9, id);
        }
        assert_eq!(cache.read_broadcast(9, 10), vec![7, 6]);
        assert_eq!(cache.broadcast_len(9), 2);
    }

    #[test]
    fn remove_broadcast_drops_only_that_id() {
        let cache = cache_with_bounds(10, 10);
        cache.push_broadcast(9, 5);
        cache.push_broadcast(9, 6);
        cache.remove_broadcast(9, 5);
        assert_eq!(cache.read_broadcast(9, 10), vec![6]);
    }

    #[test]
    fn expired_home_entry_reads_empty() {
        let cache = TimelineCache::with_ttls(
            10,
            10,
            Duration::from_millis(40),
            Duration::from_secs(60),
        );
        cache.push_home(7, 1);
        std::thread::sleep(Duration::from_millis(80));
        assert!(cache.read_home(7, 10).is_empty());
        assert_eq!(cache.home_len(7), 0);
    }

    #[test]
    fn home_pushes_do_not_extend_the_ttl() {
        let cache = TimelineCache::with_ttls(
            10,
            10,
            Duration::from_millis(300),
            Duration::from_secs(60),
        );
        cache.push_home(7, 1);
        std::thread::sleep(Duration::from_millis(180));
        cache.push_home(7, 2);
        std::thread::sleep(Duration::from_millis(180));
        // 360ms after creation the entry is gone even though the second
        // push landed mid-life.
        assert!(cache.read_home(7, 10).is_empty());
    }

    #[test]
    fn broadcast_pushes_refresh_the_ttl() {
        let cache = TimelineCache::with_ttls(
            10,
            10,
            Duration::from_secs(60),
            Duration::from_millis(300),
        );
        cache.push_broadcast(9, 1);
        std::thread::sleep(Duration::from_millis(180));
        cache.push_broadcast(9, 2);
        std::thread::sleep(Duration::from_millis(180));
        // Still alive: the second push reset the clock.
        assert_eq!(cache.read_broadcast(9, 10), vec![2, 1]);
    }

    #[test]
    fn write_after_expiry_starts_a_clean_entry() {
        let cache = TimelineCache::with_ttls(
            10,
            10,
            Duration::from_millis(40),
            Duration::from_secs(60),
        );
        cache.push_home(7, 1);
        std::thread::sleep(Duration::from_millis(80));
        cache.push_home(7, 2);
        assert_eq!(cache.read_home(7, 10), vec![2]);
    }

    #[test]
    fn fill_after_expiry_discards_stale_ids() {
        let cache = TimelineCache::with_ttls(
            10,
            10,
            Duration::from_millis(40),
            Duration::from_secs(60),
        );
        cache.push_home(7, 1);
        std::thread::sleep(Duration::from_millis(80));
        cache.fill_home(7, &[5, 6]);
        assert_eq!(cache.read_home(7, 10), vec![6, 5]);
    }
}
