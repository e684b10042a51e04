//! Publish and delete flows for posts.
//!
//! The durable write is the source of truth; fan-out and realtime
//! notification run after it and are absorbed on failure so a degraded
//! cache never turns a successful publish into an error. Timelines
//! repopulate through the read-path rebuild.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, instrument, warn};

use crate::application::error::AppError;
use crate::application::fanout::FanoutEngine;
use crate::application::repos::{AccountsRepo, PostsRepo, PostsWriteRepo};
use crate::domain::entities::{AccountRecord, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::posts::NewPost;
use crate::domain::types::{AccountId, PostId};

const METRIC_POSTS_PUBLISHED: &str = "stormo_posts_published_total";
const METRIC_POSTS_DELETED: &str = "stormo_posts_deleted_total";

/// A post that has been durably written, with its author attached so
/// callers can render it without a second lookup.
#[derive(Debug, Clone)]
pub struct PublishedPost {
    pub post: PostRecord,
    pub author: AccountRecord,
}

pub struct PublishService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    accounts: Arc<dyn AccountsRepo>,
    fanout: Arc<FanoutEngine>,
}

impl PublishService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        accounts: Arc<dyn AccountsRepo>,
        fanout: Arc<FanoutEngine>,
    ) -> Self {
        Self {
            posts,
            writer,
            accounts,
            fanout,
        }
    }

    /// Validate, persist, and distribute a new post.
    #[instrument(skip(self, draft), fields(author_id = draft.author_id))]
    pub async fn publish(&self, draft: NewPost) -> Result<PublishedPost, AppError> {
        let draft = draft.normalized()?;

        let publisher = self
            .accounts
            .find_account(draft.author_id)
            .await?
            .ok_or(DomainError::not_found("account"))?;

        if let Some(parent) = draft.reply_to_id {
            if self.posts.find_post(parent).await?.is_none() {
                return Err(DomainError::not_found("post").into());
            }
        }
        if let Some(quoted) = draft.quote_of_id {
            if self.posts.find_post(quoted).await?.is_none() {
                return Err(DomainError::not_found("post").into());
            }
        }

        let record = self.writer.create_post(draft).await?;
        counter!(METRIC_POSTS_PUBLISHED).increment(1);

        if let Err(error) = self.fanout.fanout(&record, &publisher).await {
            warn!(
                post_id = record.id,
                error = %error,
                "fan-out failed; follower timelines will repopulate on read"
            );
        }

        info!(post_id = record.id, author_id = record.author_id, "post published");
        Ok(PublishedPost {
            post: record,
            author: publisher,
        })
    }

    /// Delete a post the requester authored and withdraw it from caches.
    #[instrument(skip(self))]
    pub async fn delete(&self, requester: AccountId, post_id: PostId) -> Result<(), AppError> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(DomainError::not_found("post"))?;
        if post.author_id != requester {
            return Err(AppError::forbidden("only the author can delete a post"));
        }

        let publisher = self
            .accounts
            .find_account(requester)
            .await?
            .ok_or(DomainError::not_found("account"))?;

        self.writer.delete_post(post_id).await?;
        counter!(METRIC_POSTS_DELETED).increment(1);

        if let Err(error) = self.fanout.retract(&post, &publisher).await {
            warn!(
                post_id,
                error = %error,
                "retract failed; stale cache entries expire with their TTL"
            );
        }

        info!(post_id, author_id = requester, "post deleted");
        Ok(())
    }
}
