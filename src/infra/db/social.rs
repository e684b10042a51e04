use async_trait::async_trait;

use crate::{
    application::repos::{RepoError, SocialGraphRepo},
    domain::types::AccountId,
};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl SocialGraphRepo for PostgresRepositories {
    async fn follower_ids(&self, account: AccountId) -> Result<Vec<AccountId>, RepoError> {
        sqlx::query_scalar::<_, i64>("SELECT follower_id FROM follows WHERE followee_id = $1")
            .bind(account)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn following_regular_ids(
        &self,
        account: AccountId,
        threshold: i64,
    ) -> Result<Vec<AccountId>, RepoError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT f.followee_id FROM follows f \
             INNER JOIN accounts a ON a.id = f.followee_id \
             WHERE f.follower_id = $1 AND a.followers_count < $2",
        )
        .bind(account)
        .bind(threshold)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn following_high_fanout_ids(
        &self,
        account: AccountId,
        threshold: i64,
    ) -> Result<Vec<AccountId>, RepoError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT f.followee_id FROM follows f \
             INNER JOIN accounts a ON a.id = f.followee_id \
             WHERE f.follower_id = $1 AND a.followers_count >= $2",
        )
        .bind(account)
        .bind(threshold)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn follow(&self, follower: AccountId, followee: AccountId) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("INSERT INTO follows (follower_id, followee_id) VALUES ($1, $2)")
            .bind(follower)
            .bind(followee)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query("UPDATE accounts SET following_count = following_count + 1 WHERE id = $1")
            .bind(follower)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query("UPDATE accounts SET followers_count = followers_count + 1 WHERE id = $1")
            .bind(followee)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn unfollow(&self, follower: AccountId, followee: AccountId) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
            .bind(follower)
            .bind(followee)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        sqlx::query(
            "UPDATE accounts SET following_count = GREATEST(following_count - 1, 0) WHERE id = $1",
        )
        .bind(follower)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            "UPDATE accounts SET followers_count = GREATEST(followers_count - 1, 0) WHERE id = $1",
        )
        .bind(followee)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
