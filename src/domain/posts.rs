//! Post creation commands and their validation rules.

use crate::domain::error::DomainError;
use crate::domain::types::{AccountId, MAX_POST_CHARS, PostId};

/// A post as submitted by its author, before the durable store assigns
/// an id. `body` is stored as given after trimming; rendering concerns
/// (mentions, links) belong to clients.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub author_id: AccountId,
    pub body: String,
    pub reply_to_id: Option<PostId>,
    pub quote_of_id: Option<PostId>,
}

impl NewPost {
    /// Trim surrounding whitespace and enforce the body bounds.
    /// Character count is measured in scalar values, not bytes, matching
    /// what clients display as the remaining-character budget.
    pub fn normalized(mut self) -> Result<Self, DomainError> {
        let trimmed = self.body.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("post body must not be empty"));
        }
        if trimmed.chars().count() > MAX_POST_CHARS {
            return Err(DomainError::validation(format!(
                "post body exceeds {MAX_POST_CHARS} characters"
            )));
        }
        if self.reply_to_id.is_some() && self.quote_of_id.is_some() {
            return Err(DomainError::validation(
                "a post cannot be both a reply and a quote",
            ));
        }
        self.body = trimmed.to_string();
        Ok(self)
    }
}
