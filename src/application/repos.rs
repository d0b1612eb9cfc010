//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::actor::Permission;
use crate::domain::entities::{
    CategoryRecord, ContactRecord, PostRecord, ProductRecord, SessionRecord, UserRecord,
};
use crate::domain::milestone::CounterChange;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which rows a listing query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    PublishedOnly,
    All,
}

impl Visibility {
    pub fn for_staff(is_staff: bool) -> Self {
        if is_staff { Self::All } else { Self::PublishedOnly }
    }

    pub fn admits(self, is_published: bool) -> bool {
        matches!(self, Self::All) || is_published
    }
}

#[derive(Debug, Clone)]
pub struct ProductParams {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub category_id: Uuid,
    pub price_minor: i64,
    pub is_published: bool,
}

#[async_trait]
pub trait ProductsRepo: Send + Sync {
    /// Newest first.
    async fn list_products(&self, visibility: Visibility) -> Result<Vec<ProductRecord>, RepoError>;

    /// Newest first.
    async fn list_products_in_category(
        &self,
        category_id: Uuid,
        visibility: Visibility,
    ) -> Result<Vec<ProductRecord>, RepoError>;

    async fn find_product(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError>;

    async fn create_product(
        &self,
        params: ProductParams,
        owner_id: Option<Uuid>,
    ) -> Result<ProductRecord, RepoError>;

    async fn update_product(&self, id: Uuid, params: ProductParams)
    -> Result<ProductRecord, RepoError>;

    async fn set_product_published(
        &self,
        id: Uuid,
        is_published: bool,
    ) -> Result<ProductRecord, RepoError>;

    /// Returns the affected records; unknown ids are skipped.
    async fn set_products_published(
        &self,
        ids: &[Uuid],
        is_published: bool,
    ) -> Result<Vec<ProductRecord>, RepoError>;

    async fn delete_product(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    async fn create_category(
        &self,
        name: &str,
        description: &str,
    ) -> Result<CategoryRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct ContactParams {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub about: String,
}

#[async_trait]
pub trait ContactsRepo: Send + Sync {
    async fn list_contacts(&self) -> Result<Vec<ContactRecord>, RepoError>;

    async fn create_contact(&self, params: ContactParams) -> Result<ContactRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct PostParams {
    pub title: String,
    pub content: String,
    pub preview: Option<String>,
    pub is_published: bool,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Newest first.
    async fn list_posts(&self, visibility: Visibility) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn create_post(
        &self,
        params: PostParams,
        owner_id: Option<Uuid>,
    ) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, id: Uuid, params: PostParams) -> Result<PostRecord, RepoError>;

    async fn set_post_published(&self, id: Uuid, is_published: bool)
    -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;

    /// Atomically add one view and return the counter on both sides of the write.
    async fn increment_views(&self, id: Uuid) -> Result<CounterChange, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub phone: String,
    pub country: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileParams {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub phone: String,
    pub country: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn update_profile(
        &self,
        id: Uuid,
        params: UpdateProfileParams,
    ) -> Result<UserRecord, RepoError>;

    async fn delete_user(&self, id: Uuid) -> Result<(), RepoError>;

    /// Direct grants plus grants inherited from groups.
    async fn effective_permissions(&self, user_id: Uuid) -> Result<Vec<Permission>, RepoError>;

    /// Create the group if missing and replace its permission set.
    async fn upsert_group(&self, name: &str, permissions: &[Permission]) -> Result<(), RepoError>;

    async fn add_to_group(&self, user_id: Uuid, group: &str) -> Result<(), RepoError>;

    async fn grant_permission(&self, user_id: Uuid, permission: Permission)
    -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub user_id: Uuid,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, params: CreateSessionParams)
    -> Result<SessionRecord, RepoError>;

    async fn find_session_by_prefix(&self, prefix: &str)
    -> Result<Option<SessionRecord>, RepoError>;

    async fn delete_session(&self, id: Uuid) -> Result<(), RepoError>;

    async fn delete_sessions_for_user(&self, user_id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
