use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{AccountsRepo, RepoError},
    domain::entities::AccountRecord,
    domain::types::AccountId,
};
use stormo_api_types::AccountView;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    handle: String,
    display_name: String,
    bio: Option<String>,
    avatar_url: Option<String>,
    followers_count: i64,
    following_count: i64,
    posts_count: i64,
    created_at: OffsetDateTime,
}

impl From<AccountRow> for AccountRecord {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            handle: row.handle,
            display_name: row.display_name,
            bio: row.bio,
            avatar_url: row.avatar_url,
            followers_count: row.followers_count,
            following_count: row.following_count,
            posts_count: row.posts_count,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AccountsRepo for PostgresRepositories {
    async fn find_account(&self, id: AccountId) -> Result<Option<AccountRecord>, RepoError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, handle, display_name, bio, avatar_url, \
             followers_count, following_count, posts_count, created_at \
             FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AccountRecord::from))
    }

    async fn author_cards(&self, ids: &[AccountId]) -> Result<Vec<AccountView>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, AccountView>(
            "SELECT id, handle, display_name, avatar_url FROM accounts WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
