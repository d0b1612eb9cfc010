use async_trait::async_trait;
use sqlx::{FromRow, query, query_as, query_scalar};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::application::repos::{CreateUserParams, RepoError, UpdateProfileParams, UsersRepo};
use crate::domain::actor::Permission;
use crate::domain::entities::UserRecord;

use super::{PostgresRepositories, map_sqlx_error};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, avatar, phone, \
    country, is_staff, is_superuser, is_active, created_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    avatar: Option<String>,
    phone: String,
    country: String,
    is_staff: bool,
    is_superuser: bool,
    is_active: bool,
    created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            avatar: row.avatar,
            phone: row.phone,
            country: row.country,
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let sql = format!(
            "INSERT INTO users \
             (id, email, password_hash, first_name, last_name, avatar, phone, country, \
              is_staff, is_superuser, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE, $11) \
             RETURNING {USER_COLUMNS}"
        );
        let row = query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.email.to_lowercase())
            .bind(params.password_hash)
            .bind(params.first_name)
            .bind(params.last_name)
            .bind(params.avatar)
            .bind(params.phone)
            .bind(params.country)
            .bind(params.is_staff)
            .bind(params.is_superuser)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let row = query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        params: UpdateProfileParams,
    ) -> Result<UserRecord, RepoError> {
        let sql = format!(
            "UPDATE users SET email = $2, first_name = $3, last_name = $4, avatar = $5, \
             phone = $6, country = $7 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(params.email.to_lowercase())
            .bind(params.first_name)
            .bind(params.last_name)
            .bind(params.avatar)
            .bind(params.phone)
            .bind(params.country)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(Into::into).ok_or(RepoError::NotFound)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), RepoError> {
        let result = query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn effective_permissions(&self, user_id: Uuid) -> Result<Vec<Permission>, RepoError> {
        let codenames = query_scalar::<_, String>(
            "SELECT codename FROM user_permissions WHERE user_id = $1 \
             UNION \
             SELECT gp.codename FROM group_permissions gp \
             INNER JOIN user_groups ug ON ug.group_id = gp.group_id \
             WHERE ug.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut permissions = Vec::with_capacity(codenames.len());
        for codename in codenames {
            match codename.parse::<Permission>() {
                Ok(permission) => permissions.push(permission),
                Err(()) => warn!(
                    target = "skystore::db::users",
                    %user_id,
                    codename = %codename,
                    "ignoring unknown permission codename"
                ),
            }
        }
        Ok(permissions)
    }

    async fn upsert_group(&self, name: &str, permissions: &[Permission]) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let group_id = query_scalar::<_, Uuid>(
            "INSERT INTO permission_groups (id, name) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        query("DELETE FROM group_permissions WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        for permission in permissions {
            query("INSERT INTO group_permissions (group_id, codename) VALUES ($1, $2)")
                .bind(group_id)
                .bind(permission.as_str())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn add_to_group(&self, user_id: Uuid, group: &str) -> Result<(), RepoError> {
        let result = query(
            "INSERT INTO user_groups (user_id, group_id) \
             SELECT $1, id FROM permission_groups WHERE name = $2 \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(group)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            let exists = query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM permission_groups WHERE name = $1)",
            )
            .bind(group)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
            if !exists {
                return Err(RepoError::NotFound);
            }
        }
        Ok(())
    }

    async fn grant_permission(
        &self,
        user_id: Uuid,
        permission: Permission,
    ) -> Result<(), RepoError> {
        query(
            "INSERT INTO user_permissions (user_id, codename) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(permission.as_str())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}
