//! Read-path timeline assembly.
//!
//! Home pages are served from the viewer's home cache merged with the
//! broadcast caches of any high-fanout accounts they follow. An empty
//! merge triggers a one-shot rebuild from storage before pagination is
//! applied. Author pages bypass the caches and read storage directly.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, instrument};

use crate::application::error::AppError;
use crate::application::pagination::{PageRequest, TimelineCursor, TimelinePage};
use crate::application::repos::{
    AccountsRepo, EngagementRepo, PostsRepo, RepoError, SocialGraphRepo,
};
use crate::cache::{CacheConfig, TimelineCache};
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::types::{AccountId, PostId};
use stormo_api_types::{AccountView, PostView};

const METRIC_HOME_CACHE_HIT: &str = "stormo_timeline_cache_hit_total";
const METRIC_HOME_CACHE_MISS: &str = "stormo_timeline_cache_miss_total";
const METRIC_HOME_REBUILD: &str = "stormo_timeline_rebuild_total";
const METRIC_ASSEMBLE_MS: &str = "stormo_timeline_assemble_ms";

/// Assembles enriched timeline pages for a viewer.
pub struct TimelineAssembler {
    cache: Arc<TimelineCache>,
    social: Arc<dyn SocialGraphRepo>,
    posts: Arc<dyn PostsRepo>,
    accounts: Arc<dyn AccountsRepo>,
    engagement: Arc<dyn EngagementRepo>,
    config: CacheConfig,
}

impl TimelineAssembler {
    pub fn new(
        cache: Arc<TimelineCache>,
        social: Arc<dyn SocialGraphRepo>,
        posts: Arc<dyn PostsRepo>,
        accounts: Arc<dyn AccountsRepo>,
        engagement: Arc<dyn EngagementRepo>,
        config: CacheConfig,
    ) -> Self {
        Self {
            cache,
            social,
            posts,
            accounts,
            engagement,
            config,
        }
    }

    /// Assemble one page of the viewer's home timeline, newest first.
    #[instrument(skip(self, page), fields(viewer = viewer, limit = page.limit))]
    pub async fn home(
        &self,
        viewer: AccountId,
        page: PageRequest,
    ) -> Result<TimelinePage<PostView>, AppError> {
        let started_at = Instant::now();
        let limit = page.limit as usize;
        let window = limit + self.config.overfetch as usize;

        let cached = self.cache.read_home(viewer, window);
        if cached.is_empty() {
            counter!(METRIC_HOME_CACHE_MISS).increment(1);
        } else {
            counter!(METRIC_HOME_CACHE_HIT).increment(1);
        }

        let mut merged: BTreeSet<PostId> = cached.into_iter().collect();
        let broadcasters = self
            .social
            .following_high_fanout_ids(viewer, self.config.celebrity_threshold)
            .await?;
        for &publisher in &broadcasters {
            merged.extend(self.cache.read_broadcast(publisher, limit));
        }

        if merged.is_empty() {
            merged = self.rebuild_home(viewer, limit).await?;
        }

        // Newest first, strictly older than the cursor when one is present.
        let mut ids: Vec<PostId> = match page.cursor {
            Some(cursor) => merged.range(..cursor.before()).rev().copied().collect(),
            None => merged.iter().rev().copied().collect(),
        };

        let has_more = ids.len() > limit;
        ids.truncate(limit);

        let items = self.enrich(viewer, &ids).await?;
        let page = finish_page(items, has_more);

        histogram!(METRIC_ASSEMBLE_MS, "source" => "home")
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        Ok(page)
    }

    /// Assemble one page of an author's own posts, top-level only.
    #[instrument(skip(self, page), fields(author = author, limit = page.limit))]
    pub async fn author(
        &self,
        viewer: AccountId,
        author: AccountId,
        page: PageRequest,
    ) -> Result<TimelinePage<PostView>, AppError> {
        let started_at = Instant::now();
        if self.accounts.find_account(author).await?.is_none() {
            return Err(DomainError::not_found("account").into());
        }

        let limit = page.limit as usize;
        let before = page.cursor.map(|cursor| cursor.before());
        let mut records = self
            .posts
            .posts_by_author(author, before, page.limit + 1, true)
            .await?;

        let has_more = records.len() > limit;
        records.truncate(limit);

        let items = self.enrich_records(viewer, records).await?;
        let page = finish_page(items, has_more);

        histogram!(METRIC_ASSEMBLE_MS, "source" => "author")
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        Ok(page)
    }

    /// Repopulate an empty home cache from the viewer's push-model
    /// followees. Broadcast-tier followees are intentionally not part of
    /// the rebuild; their posts re-enter through the merge step.
    async fn rebuild_home(
        &self,
        viewer: AccountId,
        limit: usize,
    ) -> Result<BTreeSet<PostId>, RepoError> {
        counter!(METRIC_HOME_REBUILD).increment(1);

        let followees = self
            .social
            .following_regular_ids(viewer, self.config.celebrity_threshold)
            .await?;
        if followees.is_empty() {
            return Ok(BTreeSet::new());
        }

        let recent = self
            .posts
            .recent_posts_by_authors(&followees, (limit * 2) as u32)
            .await?;
        let ids: Vec<PostId> = recent.iter().map(|post| post.id).collect();
        self.cache.fill_home(viewer, &ids);

        debug!(viewer, restored = ids.len(), "home cache rebuilt from storage");
        Ok(ids.into_iter().collect())
    }

    /// Hydrate an ordered id list into post views. Ids whose rows have
    /// been deleted since they were cached are skipped; the input order
    /// is authoritative for the output.
    async fn enrich(
        &self,
        viewer: AccountId,
        ids: &[PostId],
    ) -> Result<Vec<PostView>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let fetched = self.posts.posts_by_ids(ids).await?;
        let mut by_id: HashMap<PostId, PostRecord> =
            fetched.into_iter().map(|post| (post.id, post)).collect();
        let ordered: Vec<PostRecord> = ids.iter().filter_map(|id| by_id.remove(id)).collect();

        self.enrich_records(viewer, ordered).await
    }

    /// Attach author cards and the viewer's engagement flags, one batched
    /// repository call each per page.
    async fn enrich_records(
        &self,
        viewer: AccountId,
        records: Vec<PostRecord>,
    ) -> Result<Vec<PostView>, RepoError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut author_ids: Vec<AccountId> = records.iter().map(|post| post.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors: HashMap<AccountId, AccountView> = self
            .accounts
            .author_cards(&author_ids)
            .await?
            .into_iter()
            .map(|card| (card.id, card))
            .collect();

        let post_ids: Vec<PostId> = records.iter().map(|post| post.id).collect();
        let flags = self.engagement.engagement_state(viewer, &post_ids).await?;

        let mut items = Vec::with_capacity(records.len());
        for record in records {
            // Author row gone means the post cannot be rendered; drop it.
            let Some(author) = authors.get(&record.author_id) else {
                continue;
            };
            let state = flags.get(&record.id).copied().unwrap_or_default();
            items.push(PostView {
                id: record.id,
                author: author.clone(),
                body: record.body,
                reply_to_id: record.reply_to_id,
                quote_of_id: record.quote_of_id,
                likes_count: record.likes_count,
                reposts_count: record.reposts_count,
                replies_count: record.replies_count,
                created_at: record.created_at,
                liked: state.liked,
                reposted: state.reposted,
            });
        }
        Ok(items)
    }
}

/// Seal a page: the next cursor is the id of the last item actually
/// returned, and only when more items may exist below it.
fn finish_page(items: Vec<PostView>, has_more: bool) -> TimelinePage<PostView> {
    let has_more = has_more && !items.is_empty();
    let next_cursor = if has_more {
        items
            .last()
            .map(|item| TimelineCursor::new(item.id).encode())
    } else {
        None
    };
    TimelinePage {
        items,
        next_cursor,
        has_more,
    }
}
