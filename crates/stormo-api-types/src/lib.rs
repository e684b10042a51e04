//! Wire types shared between the Stormo server and its API clients.
//!
//! Everything here is a plain serde shape: no behavior, no validation
//! beyond what the derive gives us. The server maps its domain entities
//! into these views at the HTTP boundary; clients deserialize them
//! without pulling in the server crate.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Compact author projection embedded in every post view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AccountView {
    pub id: i64,
    pub handle: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A fully enriched post as returned by the timeline endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub author: AccountView,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_of_id: Option<i64>,
    pub likes_count: i64,
    pub reposts_count: i64,
    pub replies_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Whether the requesting viewer has liked this post.
    pub liked: bool,
    /// Whether the requesting viewer has reposted this post.
    pub reposted: bool,
}

/// One cursor-delimited page of a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePageBody {
    pub items: Vec<PostView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Request body for `POST /api/v1/posts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePostBody {
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_of_id: Option<i64>,
}

/// Discriminant for frames pushed over the live socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Posted,
    Deleted,
}

/// One frame pushed to a connected live subscriber.
///
/// `content` is present only for `posted` frames; deletions carry just
/// the identifiers so the client can drop the post from view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeFrame {
    pub kind: FrameKind,
    pub post_id: i64,
    pub publisher_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
