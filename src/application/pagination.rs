//! Shared cursor pagination helpers.

use serde::Serialize;
use thiserror::Error;

use crate::domain::types::PostId;

/// Default page size when the request does not name one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
/// Hard ceiling on requested page sizes.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Cursor for paginating timelines in reverse chronological order.
///
/// The wire format is the bare decimal encoding of the last post id the
/// client has already seen; the next page contains strictly older ids.
/// Nothing about the encoding is secret, and clients are allowed to
/// fabricate cursors, so decoding never trusts the value beyond parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineCursor {
    before: PostId,
}

impl TimelineCursor {
    pub fn new(before: PostId) -> Self {
        Self { before }
    }

    /// Id boundary already shown to the client; pages resume strictly
    /// below it.
    pub fn before(&self) -> PostId {
        self.before
    }

    pub fn encode(&self) -> String {
        self.before.to_string()
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        cursor
            .parse::<PostId>()
            .map(Self::new)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))
    }

    /// Decode, treating anything unparseable as "no cursor". Stale or
    /// tampered client state restarts pagination from the newest post
    /// instead of failing the request.
    pub fn decode_lossy(cursor: Option<&str>) -> Option<Self> {
        cursor.and_then(|raw| Self::decode(raw).ok())
    }
}

/// Cursor-aware pagination request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub limit: u32,
    pub cursor: Option<TimelineCursor>,
}

impl PageRequest {
    pub fn new(limit: u32, cursor: Option<TimelineCursor>) -> Self {
        Self { limit, cursor }
    }

    /// Build a request from raw query parameters: clamp the limit into
    /// `1..=MAX_PAGE_LIMIT` and decode the cursor lossily.
    pub fn from_wire(limit: Option<u32>, cursor: Option<&str>) -> Self {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        Self::new(limit, TimelineCursor::decode_lossy(cursor))
    }
}

/// One assembled page of a timeline.
///
/// `next_cursor` is present only when `has_more` is true and the page is
/// non-empty; it always encodes the id of the last item actually
/// returned, never an id the client has not seen.
#[derive(Debug, Clone, Serialize)]
pub struct TimelinePage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> TimelinePage<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trip() {
        let cursor = TimelineCursor::new(12345);
        assert_eq!(cursor.encode(), "12345");

        let decoded = TimelineCursor::decode("12345").expect("decoded cursor");
        assert_eq!(decoded.before(), 12345);
    }

    #[test]
    fn decoding_invalid_cursor_reports_error() {
        let err = TimelineCursor::decode("abc").expect_err("invalid cursor rejected");
        assert!(matches!(err, PaginationError::InvalidCursor(_)));
    }

    #[test]
    fn lossy_decode_swallows_garbage() {
        assert_eq!(TimelineCursor::decode_lossy(None), None);
        assert_eq!(TimelineCursor::decode_lossy(Some("abc")), None);
        assert_eq!(TimelineCursor::decode_lossy(Some("")), None);
        assert_eq!(
            TimelineCursor::decode_lossy(Some("99999999999999999999")),
            None
        );
        assert_eq!(
            TimelineCursor::decode_lossy(Some("16")),
            Some(TimelineCursor::new(16))
        );
    }

    #[test]
    fn wire_request_clamps_limit() {
        assert_eq!(PageRequest::from_wire(None, None).limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(PageRequest::from_wire(Some(0), None).limit, 1);
        assert_eq!(
            PageRequest::from_wire(Some(1000), None).limit,
            MAX_PAGE_LIMIT
        );

        let request = PageRequest::from_wire(Some(10), Some("16"));
        assert_eq!(request.limit, 10);
        assert_eq!(request.cursor, Some(TimelineCursor::new(16)));
    }
}
