//! Repository traits describing persistence adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::PaginationError;
use crate::domain::entities::{AccountRecord, EngagementFlags, PostRecord};
use crate::domain::posts::NewPost;
use crate::domain::types::{AccountId, PostId};
use stormo_api_types::AccountView;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Follow-graph queries and mutations.
///
/// The high-fanout/regular split takes the threshold as a parameter so
/// the adapter stays free of configuration; callers pass the configured
/// celebrity threshold.
#[async_trait]
pub trait SocialGraphRepo: Send + Sync {
    /// Every account following `account`, unordered.
    async fn follower_ids(&self, account: AccountId) -> Result<Vec<AccountId>, RepoError>;

    /// Accounts `account` follows whose follower count is below `threshold`.
    async fn following_regular_ids(
        &self,
        account: AccountId,
        threshold: i64,
    ) -> Result<Vec<AccountId>, RepoError>;

    /// Accounts `account` follows whose follower count meets `threshold`.
    async fn following_high_fanout_ids(
        &self,
        account: AccountId,
        threshold: i64,
    ) -> Result<Vec<AccountId>, RepoError>;

    /// Record a follow edge and bump both denormalized counts.
    async fn follow(&self, follower: AccountId, followee: AccountId) -> Result<(), RepoError>;

    /// Remove a follow edge; `NotFound` when the edge does not exist.
    async fn unfollow(&self, follower: AccountId, followee: AccountId) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError>;

    /// Posts authored by `author` with id strictly below `before` (when
    /// given), newest first. `exclude_replies` keeps only top-level posts.
    async fn posts_by_author(
        &self,
        author: AccountId,
        before: Option<PostId>,
        limit: u32,
        exclude_replies: bool,
    ) -> Result<Vec<PostRecord>, RepoError>;

    /// The most recent top-level posts across a set of authors, newest
    /// first. Used to rebuild a cold timeline cache.
    async fn recent_posts_by_authors(
        &self,
        authors: &[AccountId],
        limit: u32,
    ) -> Result<Vec<PostRecord>, RepoError>;

    /// Fetch by id set; ids that no longer exist are simply absent from
    /// the result, in no guaranteed order.
    async fn posts_by_ids(&self, ids: &[PostId]) -> Result<Vec<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    /// Insert the post, assign its id, and bump the author's post count
    /// (and the parent's reply count when replying).
    async fn create_post(&self, post: NewPost) -> Result<PostRecord, RepoError>;

    /// Delete the post and roll the affected counts back down.
    async fn delete_post(&self, id: PostId) -> Result<(), RepoError>;
}

#[async_trait]
pub trait AccountsRepo: Send + Sync {
    async fn find_account(&self, id: AccountId) -> Result<Option<AccountRecord>, RepoError>;

    /// Compact author projections for timeline enrichment, keyed lookup
    /// by the caller; order is not significant.
    async fn author_cards(&self, ids: &[AccountId]) -> Result<Vec<AccountView>, RepoError>;
}

#[async_trait]
pub trait EngagementRepo: Send + Sync {
    /// Which of `posts` the viewer has liked or reposted, one batched
    /// call per timeline page. Posts absent from the map carry default
    /// (all-false) flags.
    async fn engagement_state(
        &self,
        viewer: AccountId,
        posts: &[PostId],
    ) -> Result<HashMap<PostId, EngagementFlags>, RepoError>;

    async fn like(&self, account: AccountId, post: PostId) -> Result<(), RepoError>;

    async fn unlike(&self, account: AccountId, post: PostId) -> Result<(), RepoError>;

    async fn repost(&self, account: AccountId, post: PostId) -> Result<(), RepoError>;

    async fn unrepost(&self, account: AccountId, post: PostId) -> Result<(), RepoError>;
}
