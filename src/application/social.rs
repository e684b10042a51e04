//! Follow-graph and engagement mutations.
//!
//! Follow changes invalidate the follower's home cache so the next read
//! rebuilds against the updated followee set instead of waiting out the
//! TTL on a stale entry.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, instrument};

use crate::application::error::AppError;
use crate::application::repos::{AccountsRepo, EngagementRepo, PostsRepo, SocialGraphRepo};
use crate::cache::TimelineCache;
use crate::domain::error::DomainError;
use crate::domain::types::{AccountId, PostId};

const METRIC_FOLLOWS: &str = "stormo_follows_total";
const METRIC_ENGAGEMENT: &str = "stormo_engagement_total";

pub struct SocialService {
    social: Arc<dyn SocialGraphRepo>,
    accounts: Arc<dyn AccountsRepo>,
    posts: Arc<dyn PostsRepo>,
    engagement: Arc<dyn EngagementRepo>,
    cache: Arc<TimelineCache>,
}

impl SocialService {
    pub fn new(
        social: Arc<dyn SocialGraphRepo>,
        accounts: Arc<dyn AccountsRepo>,
        posts: Arc<dyn PostsRepo>,
        engagement: Arc<dyn EngagementRepo>,
        cache: Arc<TimelineCache>,
    ) -> Self {
        Self {
            social,
            accounts,
            posts,
            engagement,
            cache,
        }
    }

    #[instrument(skip(self))]
    pub async fn follow(&self, follower: AccountId, followee: AccountId) -> Result<(), AppError> {
        if follower == followee {
            return Err(DomainError::validation("cannot follow yourself").into());
        }
        if self.accounts.find_account(followee).await?.is_none() {
            return Err(DomainError::not_found("account").into());
        }

        self.social.follow(follower, followee).await?;
        self.cache.invalidate_home(follower);

        counter!(METRIC_FOLLOWS, "op" => "follow").increment(1);
        info!(follower, followee, "follow recorded");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unfollow(&self, follower: AccountId, followee: AccountId) -> Result<(), AppError> {
        self.social.unfollow(follower, followee).await?;
        self.cache.invalidate_home(follower);

        counter!(METRIC_FOLLOWS, "op" => "unfollow").increment(1);
        info!(follower, followee, "follow removed");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn like(&self, account: AccountId, post: PostId) -> Result<(), AppError> {
        if self.posts.find_post(post).await?.is_none() {
            return Err(DomainError::not_found("post").into());
        }
        self.engagement.like(account, post).await?;
        counter!(METRIC_ENGAGEMENT, "op" => "like").increment(1);
        debug!(account, post, "like recorded");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unlike(&self, account: AccountId, post: PostId) -> Result<(), AppError> {
        self.engagement.unlike(account, post).await?;
        counter!(METRIC_ENGAGEMENT, "op" => "unlike").increment(1);
        debug!(account, post, "like removed");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn repost(&self, account: AccountId, post: PostId) -> Result<(), AppError> {
        if self.posts.find_post(post).await?.is_none() {
            return Err(DomainError::not_found("post").into());
        }
        self.engagement.repost(account, post).await?;
        counter!(METRIC_ENGAGEMENT, "op" => "repost").increment(1);
        debug!(account, post, "repost recorded");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unrepost(&self, account: AccountId, post: PostId) -> Result<(), AppError> {
        self.engagement.unrepost(account, post).await?;
        counter!(METRIC_ENGAGEMENT, "op" => "unrepost").increment(1);
        debug!(account, post, "repost removed");
        Ok(())
    }
}
