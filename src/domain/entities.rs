//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::types::{AccountId, PostId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: PostId,
    pub author_id: AccountId,
    pub body: String,
    pub reply_to_id: Option<PostId>,
    pub quote_of_id: Option<PostId>,
    pub likes_count: i64,
    pub reposts_count: i64,
    pub replies_count: i64,
    pub created_at: OffsetDateTime,
}

impl PostRecord {
    /// Top-level posts are everything that is not a reply; quotes count
    /// as top-level and appear on timelines.
    pub fn is_top_level(&self) -> bool {
        self.reply_to_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRecord {
    pub id: AccountId,
    pub handle: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub created_at: OffsetDateTime,
}

/// Per-viewer engagement state for a single post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngagementFlags {
    pub liked: bool,
    pub reposted: bool,
}
