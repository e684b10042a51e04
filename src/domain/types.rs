//! Shared domain identifiers and bounds.

/// Post identifier. Assigned by the durable store from a monotonically
/// increasing sequence, so a larger id always means a newer post. Cache
/// and pagination paths rely on that: ordering by id is ordering by
/// recency, and no timestamp comparison is needed anywhere on the hot
/// path.
pub type PostId = i64;

/// Account identifier.
pub type AccountId = i64;

/// Upper bound on post body length, in characters after trimming.
pub const MAX_POST_CHARS: usize = 280;
