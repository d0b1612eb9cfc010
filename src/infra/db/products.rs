use async_trait::async_trait;
use sqlx::{FromRow, query, query_as};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{ProductParams, ProductsRepo, RepoError, Visibility};
use crate::domain::entities::ProductRecord;

use super::{PostgresRepositories, map_sqlx_error};

const PRODUCT_COLUMNS: &str = "id, name, description, image, category_id, price_minor, \
    is_published, owner_id, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    image: Option<String>,
    category_id: Uuid,
    price_minor: i64,
    is_published: bool,
    owner_id: Option<Uuid>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            image: row.image,
            category_id: row.category_id,
            price_minor: row.price_minor,
            is_published: row.is_published,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn published_only(visibility: Visibility) -> bool {
    matches!(visibility, Visibility::PublishedOnly)
}

#[async_trait]
impl ProductsRepo for PostgresRepositories {
    async fn list_products(&self, visibility: Visibility) -> Result<Vec<ProductRecord>, RepoError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1 = FALSE OR is_published) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = query_as::<_, ProductRow>(&sql)
            .bind(published_only(visibility))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_products_in_category(
        &self,
        category_id: Uuid,
        visibility: Visibility,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE category_id = $1 AND ($2 = FALSE OR is_published) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = query_as::<_, ProductRow>(&sql)
            .bind(category_id)
            .bind(published_only(visibility))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn create_product(
        &self,
        params: ProductParams,
        owner_id: Option<Uuid>,
    ) -> Result<ProductRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let sql = format!(
            "INSERT INTO products \
             (id, name, description, image, category_id, price_minor, is_published, owner_id, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = query_as::<_, ProductRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.name)
            .bind(params.description)
            .bind(params.image)
            .bind(params.category_id)
            .bind(params.price_minor)
            .bind(params.is_published)
            .bind(owner_id)
            .bind(now)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_product(
        &self,
        id: Uuid,
        params: ProductParams,
    ) -> Result<ProductRecord, RepoError> {
        let sql = format!(
            "UPDATE products SET name = $2, description = $3, image = $4, category_id = $5, \
             price_minor = $6, is_published = $7, updated_at = $8 \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let row = query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(params.name)
            .bind(params.description)
            .bind(params.image)
            .bind(params.category_id)
            .bind(params.price_minor)
            .bind(params.is_published)
            .bind(OffsetDateTime::now_utc())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(Into::into).ok_or(RepoError::NotFound)
    }

    async fn set_product_published(
        &self,
        id: Uuid,
        is_published: bool,
    ) -> Result<ProductRecord, RepoError> {
        let sql = format!(
            "UPDATE products SET is_published = $2, updated_at = $3 \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let row = query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(is_published)
            .bind(OffsetDateTime::now_utc())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(Into::into).ok_or(RepoError::NotFound)
    }

    async fn set_products_published(
        &self,
        ids: &[Uuid],
        is_published: bool,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "UPDATE products SET is_published = $2, updated_at = $3 \
             WHERE id = ANY($1) RETURNING {PRODUCT_COLUMNS}"
        );
        let rows = query_as::<_, ProductRow>(&sql)
            .bind(ids)
            .bind(is_published)
            .bind(OffsetDateTime::now_utc())
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), RepoError> {
        let result = query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
