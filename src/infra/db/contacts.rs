use async_trait::async_trait;
use sqlx::{FromRow, query_as};
use uuid::Uuid;

use crate::application::repos::{ContactParams, ContactsRepo, RepoError};
use crate::domain::entities::ContactRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(Debug, FromRow)]
struct ContactRow {
    id: Uuid,
    name: String,
    phone: String,
    email: String,
    address: String,
    about: String,
}

impl From<ContactRow> for ContactRecord {
    fn from(row: ContactRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            address: row.address,
            about: row.about,
        }
    }
}

#[async_trait]
impl ContactsRepo for PostgresRepositories {
    async fn list_contacts(&self) -> Result<Vec<ContactRecord>, RepoError> {
        let rows = query_as::<_, ContactRow>(
            "SELECT id, name, phone, email, address, about FROM contacts ORDER BY name ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_contact(&self, params: ContactParams) -> Result<ContactRecord, RepoError> {
        let row = query_as::<_, ContactRow>(
            "INSERT INTO contacts (id, name, phone, email, address, about) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, name, phone, email, address, about",
        )
        .bind(Uuid::new_v4())
        .bind(params.name)
        .bind(params.phone)
        .bind(params.email)
        .bind(params.address)
        .bind(params.about)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}
