use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::repos::{PostsRepo, PostsWriteRepo, RepoError},
    domain::entities::PostRecord,
    domain::posts::NewPost,
    domain::types::{AccountId, PostId},
};

use super::{PostgresRepositories, map_sqlx_error};

const POST_COLUMNS: &str = "id, author_id, body, reply_to_id, quote_of_id, \
     likes_count, reposts_count, replies_count, created_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    author_id: i64,
    body: String,
    reply_to_id: Option<i64>,
    quote_of_id: Option<i64>,
    likes_count: i64,
    reposts_count: i64,
    replies_count: i64,
    created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            body: row.body,
            reply_to_id: row.reply_to_id,
            quote_of_id: row.quote_of_id,
            likes_count: row.likes_count,
            reposts_count: row.reposts_count,
            replies_count: row.replies_count,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn posts_by_author(
        &self,
        author: AccountId,
        before: Option<PostId>,
        limit: u32,
        exclude_replies: bool,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE author_id = "
        ));
        qb.push_bind(author);

        if exclude_replies {
            qb.push(" AND reply_to_id IS NULL");
        }
        if let Some(before) = before {
            qb.push(" AND id < ");
            qb.push_bind(before);
        }

        qb.push(" ORDER BY id DESC LIMIT ");
        qb.push_bind(i64::from(limit));

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn recent_posts_by_authors(
        &self,
        authors: &[AccountId],
        limit: u32,
    ) -> Result<Vec<PostRecord>, RepoError> {
        if authors.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE author_id = ANY($1) AND reply_to_id IS NULL \
             ORDER BY id DESC LIMIT $2"
        ))
        .bind(authors)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn posts_by_ids(&self, ids: &[PostId]) -> Result<Vec<PostRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, post: NewPost) -> Result<PostRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts (author_id, body, reply_to_id, quote_of_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(post.author_id)
        .bind(&post.body)
        .bind(post.reply_to_id)
        .bind(post.quote_of_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("UPDATE accounts SET posts_count = posts_count + 1 WHERE id = $1")
            .bind(post.author_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if let Some(parent) = post.reply_to_id {
            sqlx::query("UPDATE posts SET replies_count = replies_count + 1 WHERE id = $1")
                .bind(parent)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        // Likes and reposts cascade with the row; only the denormalized
        // counts need rolling back here.
        let deleted = sqlx::query_as::<_, PostRow>(&format!(
            "DELETE FROM posts WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(post) = deleted else {
            return Err(RepoError::NotFound);
        };

        sqlx::query(
            "UPDATE accounts SET posts_count = GREATEST(posts_count - 1, 0) WHERE id = $1",
        )
        .bind(post.author_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if let Some(parent) = post.reply_to_id {
            sqlx::query(
                "UPDATE posts SET replies_count = GREATEST(replies_count - 1, 0) WHERE id = $1",
            )
            .bind(parent)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
