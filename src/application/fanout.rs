//! Write-path fan-out for published and retracted posts.
//!
//! Every publish resolves a strategy from the publisher's follower count
//! and either pushes the post id into each follower's home cache or parks
//! it in the publisher's broadcast cache for merge at read time.

use std::sync::Arc;

use metrics::{counter, histogram};
use tracing::{debug, instrument};

use crate::application::repos::{RepoError, SocialGraphRepo};
use crate::cache::TimelineCache;
use crate::domain::entities::{AccountRecord, PostRecord};
use crate::realtime::{EventBus, RealtimeEvent};

const METRIC_FANOUT_PUSH_TOTAL: &str = "stormo_fanout_push_total";
const METRIC_FANOUT_PULL_TOTAL: &str = "stormo_fanout_pull_total";
const METRIC_FANOUT_RECIPIENTS: &str = "stormo_fanout_recipients";
const METRIC_RETRACT_TOTAL: &str = "stormo_retract_total";

/// How a post travels from its publisher to follower timelines.
///
/// Resolved exactly once per publish; a publisher crossing the threshold
/// later does not migrate ids already placed by the old strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutStrategy {
    /// Insert the post id into every follower's home cache at write time.
    Push,
    /// Park the post id in the publisher's broadcast cache; followers
    /// merge it in when their timeline is read.
    Pull,
}

impl FanoutStrategy {
    pub fn for_follower_count(followers: i64, celebrity_threshold: i64) -> Self {
        if followers >= celebrity_threshold {
            Self::Pull
        } else {
            Self::Push
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
        }
    }
}

/// Applies the resolved strategy against the timeline caches and notifies
/// the realtime relay.
pub struct FanoutEngine {
    social: Arc<dyn SocialGraphRepo>,
    cache: Arc<TimelineCache>,
    bus: EventBus,
    celebrity_threshold: i64,
}

impl FanoutEngine {
    pub fn new(
        social: Arc<dyn SocialGraphRepo>,
        cache: Arc<TimelineCache>,
        bus: EventBus,
        celebrity_threshold: i64,
    ) -> Self {
        Self {
            social,
            cache,
            bus,
            celebrity_threshold,
        }
    }

    /// Distribute a freshly created post.
    ///
    /// Returns the number of cache writes performed: one per follower on
    /// the push path, exactly one on the pull path. The realtime event is
    /// emitted on both paths, even when the publisher has no followers.
    #[instrument(skip(self, post, publisher), fields(post_id = post.id, publisher_id = publisher.id))]
    pub async fn fanout(
        &self,
        post: &PostRecord,
        publisher: &AccountRecord,
    ) -> Result<u64, RepoError> {
        let followers = self.social.follower_ids(publisher.id).await?;
        let strategy =
            FanoutStrategy::for_follower_count(publisher.followers_count, self.celebrity_threshold);

        let writes = match strategy {
            FanoutStrategy::Push => {
                for &follower in &followers {
                    self.cache.push_home(follower, post.id);
                }
                counter!(METRIC_FANOUT_PUSH_TOTAL).increment(1);
                histogram!(METRIC_FANOUT_RECIPIENTS).record(followers.len() as f64);
                followers.len() as u64
            }
            FanoutStrategy::Pull => {
                self.cache.push_broadcast(publisher.id, post.id);
                counter!(METRIC_FANOUT_PULL_TOTAL).increment(1);
                1
            }
        };

        debug!(
            strategy = strategy.label(),
            followers = followers.len(),
            cache_writes = writes,
            "post fanned out"
        );

        self.bus.publish(RealtimeEvent::Posted {
            post_id: post.id,
            publisher_id: publisher.id,
            content: post.body.clone(),
            recipients: followers,
        });

        Ok(writes)
    }

    /// Withdraw a deleted post from whichever cache side the publisher's
    /// current tier selects, then notify connected clients.
    #[instrument(skip(self, post, publisher), fields(post_id = post.id, publisher_id = publisher.id))]
    pub async fn retract(
        &self,
        post: &PostRecord,
        publisher: &AccountRecord,
    ) -> Result<(), RepoError> {
        let strategy =
            FanoutStrategy::for_follower_count(publisher.followers_count, self.celebrity_threshold);

        match strategy {
            FanoutStrategy::Push => {
                let followers = self.social.follower_ids(publisher.id).await?;
                for &follower in &followers {
                    self.cache.remove_home(follower, post.id);
                }
            }
            FanoutStrategy::Pull => {
                self.cache.remove_broadcast(publisher.id, post.id);
            }
        }

        counter!(METRIC_RETRACT_TOTAL, "strategy" => strategy.label()).increment(1);
        debug!(strategy = strategy.label(), "post retracted");

        self.bus.publish(RealtimeEvent::Deleted {
            post_id: post.id,
            publisher_id: publisher.id,
        });

        Ok(())
    }
}
