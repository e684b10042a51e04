use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    application::repos::{EngagementRepo, RepoError},
    domain::entities::EngagementFlags,
    domain::types::{AccountId, PostId},
};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl EngagementRepo for PostgresRepositories {
    async fn engagement_state(
        &self,
        viewer: AccountId,
        posts: &[PostId],
    ) -> Result<HashMap<PostId, EngagementFlags>, RepoError> {
        if posts.is_empty() {
            return Ok(HashMap::new());
        }

        let liked: Vec<i64> = sqlx::query_scalar(
            "SELECT post_id FROM likes WHERE account_id = $1 AND post_id = ANY($2)",
        )
        .bind(viewer)
        .bind(posts)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let reposted: Vec<i64> = sqlx::query_scalar(
            "SELECT post_id FROM reposts WHERE account_id = $1 AND post_id = ANY($2)",
        )
        .bind(viewer)
        .bind(posts)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut flags: HashMap<PostId, EngagementFlags> = HashMap::new();
        for id in liked {
            flags.entry(id).or_default().liked = true;
        }
        for id in reposted {
            flags.entry(id).or_default().reposted = true;
        }
        Ok(flags)
    }

    async fn like(&self, account: AccountId, post: PostId) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("INSERT INTO likes (account_id, post_id) VALUES ($1, $2)")
            .bind(account)
            .bind(post)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query("UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1")
            .bind(post)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn unlike(&self, account: AccountId, post: PostId) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM likes WHERE account_id = $1 AND post_id = $2")
            .bind(account)
            .bind(post)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        sqlx::query("UPDATE posts SET likes_count = GREATEST(likes_count - 1, 0) WHERE id = $1")
            .bind(post)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn repost(&self, account: AccountId, post: PostId) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("INSERT INTO reposts (account_id, post_id) VALUES ($1, $2)")
            .bind(account)
            .bind(post)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query("UPDATE posts SET reposts_count = reposts_count + 1 WHERE id = $1")
            .bind(post)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn unrepost(&self, account: AccountId, post: PostId) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM reposts WHERE account_id = $1 AND post_id = $2")
            .bind(account)
            .bind(post)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        sqlx::query("UPDATE posts SET reposts_count = GREATEST(reposts_count - 1, 0) WHERE id = $1")
            .bind(post)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
