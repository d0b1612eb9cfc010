use async_trait::async_trait;
use sqlx::{FromRow, query, query_as, query_scalar};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{PostParams, PostsRepo, RepoError, Visibility};
use crate::domain::entities::PostRecord;
use crate::domain::milestone::CounterChange;

use super::{PostgresRepositories, map_sqlx_error};

const POST_COLUMNS: &str =
    "id, title, content, preview, is_published, views_count, owner_id, created_at, updated_at";

#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    content: String,
    preview: Option<String>,
    is_published: bool,
    views_count: i64,
    owner_id: Option<Uuid>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            preview: row.preview,
            is_published: row.is_published,
            views_count: row.views_count,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(&self, visibility: Visibility) -> Result<Vec<PostRecord>, RepoError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE ($1 = FALSE OR is_published) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = query_as::<_, PostRow>(&sql)
            .bind(matches!(visibility, Visibility::PublishedOnly))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let row = query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn create_post(
        &self,
        params: PostParams,
        owner_id: Option<Uuid>,
    ) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "INSERT INTO posts \
             (id, title, content, preview, is_published, views_count, owner_id, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $7) \
             RETURNING {POST_COLUMNS}"
        );
        let row = query_as::<_, PostRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.title)
            .bind(params.content)
            .bind(params.preview)
            .bind(params.is_published)
            .bind(owner_id)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_post(&self, id: Uuid, params: PostParams) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "UPDATE posts SET title = $2, content = $3, preview = $4, is_published = $5, \
             updated_at = $6 WHERE id = $1 RETURNING {POST_COLUMNS}"
        );
        let row = query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(params.title)
            .bind(params.content)
            .bind(params.preview)
            .bind(params.is_published)
            .bind(OffsetDateTime::now_utc())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(Into::into).ok_or(RepoError::NotFound)
    }

    async fn set_post_published(
        &self,
        id: Uuid,
        is_published: bool,
    ) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "UPDATE posts SET is_published = $2, updated_at = $3 \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        );
        let row = query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(is_published)
            .bind(OffsetDateTime::now_utc())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(Into::into).ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let result = query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    /// A single-statement increment; the row lock serializes concurrent views
    /// so each caller observes a distinct `current`.
    async fn increment_views(&self, id: Uuid) -> Result<CounterChange, RepoError> {
        let current = query_scalar::<_, i64>(
            "UPDATE posts SET views_count = views_count + 1 WHERE id = $1 RETURNING views_count",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Ok(CounterChange::new(current - 1, current))
    }
}
