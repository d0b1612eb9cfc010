#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use skystore::application::accounts::{AccountService, hash_password};
use skystore::application::blog::BlogService;
use skystore::application::catalog::CatalogService;
use skystore::application::notify::{
    MailError, MailIdentity, Mailer, MilestoneNotifier, OutgoingMail,
};
use skystore::application::repos::{
    CategoriesRepo, ContactParams, ContactsRepo, CreateSessionParams, CreateUserParams,
    HealthRepo, PostParams, PostsRepo, ProductParams, ProductsRepo, RepoError, SessionsRepo,
    UpdateProfileParams, UsersRepo, Visibility,
};
use skystore::application::sessions::SessionService;
use skystore::cache::{CacheOptions, MemorySnapshotStore};
use skystore::domain::actor::{Actor, Permission};
use skystore::domain::entities::{
    CategoryRecord, ContactRecord, PostRecord, ProductRecord, SessionRecord, UserRecord,
};
use skystore::domain::milestone::CounterChange;
use skystore::infra::http::HttpState;

pub const ADMIN_EMAIL: &str = "admin@skystore.test";
pub const FROM_EMAIL: &str = "noreply@skystore.test";

#[derive(Default)]
struct Tables {
    categories: Vec<CategoryRecord>,
    products: Vec<ProductRecord>,
    contacts: Vec<ContactRecord>,
    posts: Vec<PostRecord>,
    users: Vec<UserRecord>,
    groups: HashMap<String, BTreeSet<Permission>>,
    memberships: HashMap<Uuid, BTreeSet<String>>,
    grants: HashMap<Uuid, BTreeSet<Permission>>,
    sessions: Vec<SessionRecord>,
}

/// Every repository trait over one set of in-memory tables.
#[derive(Default)]
pub struct MemoryRepos {
    tables: Mutex<Tables>,
    product_reads: std::sync::atomic::AtomicUsize,
    session_writes_fail: AtomicBool,
}

impl MemoryRepos {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every later `create_session` call fail.
    pub fn fail_session_writes(&self) {
        self.session_writes_fail.store(true, Ordering::SeqCst);
    }

    pub fn product_reads(&self) -> usize {
        self.product_reads.load(Ordering::SeqCst)
    }

    pub async fn views_of(&self, id: Uuid) -> i64 {
        let tables = self.tables.lock().await;
        tables
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| post.views_count)
            .unwrap_or_default()
    }

    pub async fn set_views(&self, id: Uuid, views: i64) {
        let mut tables = self.tables.lock().await;
        if let Some(post) = tables.posts.iter_mut().find(|post| post.id == id) {
            post.views_count = views;
        }
    }

    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.sessions.len()
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

fn newest_first<T: Clone>(rows: &[T], created: impl Fn(&T) -> OffsetDateTime) -> Vec<T> {
    let mut rows = rows.to_vec();
    rows.sort_by_key(|row| std::cmp::Reverse(created(row)));
    rows
}

#[async_trait]
impl ProductsRepo for MemoryRepos {
    async fn list_products(&self, visibility: Visibility) -> Result<Vec<ProductRecord>, RepoError> {
        self.product_reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().await;
        let rows: Vec<_> = tables
            .products
            .iter()
            .filter(|product| visibility.admits(product.is_published))
            .cloned()
            .collect();
        Ok(newest_first(&rows, |product| product.created_at))
    }

    async fn list_products_in_category(
        &self,
        category_id: Uuid,
        visibility: Visibility,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        self.product_reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().await;
        let rows: Vec<_> = tables
            .products
            .iter()
            .filter(|product| product.category_id == category_id)
            .filter(|product| visibility.admits(product.is_published))
            .cloned()
            .collect();
        Ok(newest_first(&rows, |product| product.created_at))
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.products.iter().find(|product| product.id == id).cloned())
    }

    async fn create_product(
        &self,
        params: ProductParams,
        owner_id: Option<Uuid>,
    ) -> Result<ProductRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if !tables
            .categories
            .iter()
            .any(|category| category.id == params.category_id)
        {
            return Err(RepoError::InvalidInput {
                message: "unknown category".to_string(),
            });
        }
        let record = ProductRecord {
            id: Uuid::new_v4(),
            name: params.name,
            description: params.description,
            image: params.image,
            category_id: params.category_id,
            price_minor: params.price_minor,
            is_published: params.is_published,
            owner_id,
            created_at: now(),
            updated_at: now(),
        };
        tables.products.push(record.clone());
        Ok(record)
    }

    async fn update_product(
        &self,
        id: Uuid,
        params: ProductParams,
    ) -> Result<ProductRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let product = tables
            .products
            .iter_mut()
            .find(|product| product.id == id)
            .ok_or(RepoError::NotFound)?;
        product.name = params.name;
        product.description = params.description;
        product.image = params.image;
        product.category_id = params.category_id;
        product.price_minor = params.price_minor;
        product.is_published = params.is_published;
        product.updated_at = now();
        Ok(product.clone())
    }

    async fn set_product_published(
        &self,
        id: Uuid,
        is_published: bool,
    ) -> Result<ProductRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let product = tables
            .products
            .iter_mut()
            .find(|product| product.id == id)
            .ok_or(RepoError::NotFound)?;
        product.is_published = is_published;
        Ok(product.clone())
    }

    async fn set_products_published(
        &self,
        ids: &[Uuid],
        is_published: bool,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        let mut tables = self.tables.lock().await;
        let mut updated = Vec::new();
        for product in tables.products.iter_mut().filter(|p| ids.contains(&p.id)) {
            product.is_published = is_published;
            updated.push(product.clone());
        }
        Ok(updated)
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.products.len();
        tables.products.retain(|product| product.id != id);
        if tables.products.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CategoriesRepo for MemoryRepos {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let tables = self.tables.lock().await;
        let mut rows = tables.categories.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .categories
            .iter()
            .find(|category| category.id == id)
            .cloned())
    }

    async fn create_category(
        &self,
        name: &str,
        description: &str,
    ) -> Result<CategoryRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.categories.iter().any(|category| category.name == name) {
            return Err(RepoError::Duplicate {
                constraint: "categories_name_key".to_string(),
            });
        }
        let record = CategoryRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
        };
        tables.categories.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl ContactsRepo for MemoryRepos {
    async fn list_contacts(&self) -> Result<Vec<ContactRecord>, RepoError> {
        Ok(self.tables.lock().await.contacts.clone())
    }

    async fn create_contact(&self, params: ContactParams) -> Result<ContactRecord, RepoError> {
        let record = ContactRecord {
            id: Uuid::new_v4(),
            name: params.name,
            phone: params.phone,
            email: params.email,
            address: params.address,
            about: params.about,
        };
        self.tables.lock().await.contacts.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl PostsRepo for MemoryRepos {
    async fn list_posts(&self, visibility: Visibility) -> Result<Vec<PostRecord>, RepoError> {
        let tables = self.tables.lock().await;
        let rows: Vec<_> = tables
            .posts
            .iter()
            .filter(|post| visibility.admits(post.is_published))
            .cloned()
            .collect();
        Ok(newest_first(&rows, |post| post.created_at))
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn create_post(
        &self,
        params: PostParams,
        owner_id: Option<Uuid>,
    ) -> Result<PostRecord, RepoError> {
        let record = PostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            content: params.content,
            preview: params.preview,
            is_published: params.is_published,
            views_count: 0,
            owner_id,
            created_at: now(),
            updated_at: now(),
        };
        self.tables.lock().await.posts.push(record.clone());
        Ok(record)
    }

    async fn update_post(&self, id: Uuid, params: PostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.content = params.content;
        post.preview = params.preview;
        post.is_published = params.is_published;
        post.updated_at = now();
        Ok(post.clone())
    }

    async fn set_post_published(
        &self,
        id: Uuid,
        is_published: bool,
    ) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(RepoError::NotFound)?;
        post.is_published = is_published;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.posts.len();
        tables.posts.retain(|post| post.id != id);
        if tables.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn increment_views(&self, id: Uuid) -> Result<CounterChange, RepoError> {
        let mut tables = self.tables.lock().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(RepoError::NotFound)?;
        post.views_count += 1;
        Ok(CounterChange::new(post.views_count - 1, post.views_count))
    }
}

#[async_trait]
impl UsersRepo for MemoryRepos {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables
            .users
            .iter()
            .any(|user| user.email.eq_ignore_ascii_case(&params.email))
        {
            return Err(RepoError::Duplicate {
                constraint: "users_email_lower_key".to_string(),
            });
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: params.email,
            password_hash: params.password_hash,
            first_name: params.first_name,
            last_name: params.last_name,
            avatar: params.avatar,
            phone: params.phone,
            country: params.country,
            is_staff: params.is_staff,
            is_superuser: params.is_superuser,
            is_active: true,
            created_at: now(),
        };
        tables.users.push(record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        params: UpdateProfileParams,
    ) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(RepoError::NotFound)?;
        user.email = params.email;
        user.first_name = params.first_name;
        user.last_name = params.last_name;
        user.avatar = params.avatar;
        user.phone = params.phone;
        user.country = params.country;
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        tables.users.retain(|user| user.id != id);
        tables.memberships.remove(&id);
        tables.grants.remove(&id);
        for product in tables.products.iter_mut() {
            if product.owner_id == Some(id) {
                product.owner_id = None;
            }
        }
        for post in tables.posts.iter_mut() {
            if post.owner_id == Some(id) {
                post.owner_id = None;
            }
        }
        Ok(())
    }

    async fn effective_permissions(&self, user_id: Uuid) -> Result<Vec<Permission>, RepoError> {
        let tables = self.tables.lock().await;
        let mut permissions: BTreeSet<Permission> =
            tables.grants.get(&user_id).cloned().unwrap_or_default();
        if let Some(groups) = tables.memberships.get(&user_id) {
            for group in groups {
                if let Some(grants) = tables.groups.get(group) {
                    permissions.extend(grants.iter().copied());
                }
            }
        }
        Ok(permissions.into_iter().collect())
    }

    async fn upsert_group(&self, name: &str, permissions: &[Permission]) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        tables
            .groups
            .insert(name.to_string(), permissions.iter().copied().collect());
        Ok(())
    }

    async fn add_to_group(&self, user_id: Uuid, group: &str) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        if !tables.groups.contains_key(group) {
            return Err(RepoError::NotFound);
        }
        tables
            .memberships
            .entry(user_id)
            .or_default()
            .insert(group.to_string());
        Ok(())
    }

    async fn grant_permission(
        &self,
        user_id: Uuid,
        permission: Permission,
    ) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        tables.grants.entry(user_id).or_default().insert(permission);
        Ok(())
    }
}

#[async_trait]
impl SessionsRepo for MemoryRepos {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        if self.session_writes_fail.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("sessions table unavailable".to_string()));
        }
        let record = SessionRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            expires_at: params.expires_at,
            created_at: now(),
        };
        self.tables.lock().await.sessions.push(record.clone());
        Ok(record)
    }

    async fn find_session_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<SessionRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sessions
            .iter()
            .find(|session| session.prefix == prefix)
            .cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), RepoError> {
        self.tables
            .lock()
            .await
            .sessions
            .retain(|session| session.id != id);
        Ok(())
    }

    async fn delete_sessions_for_user(&self, user_id: Uuid) -> Result<(), RepoError> {
        self.tables
            .lock()
            .await
            .sessions
            .retain(|session| session.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryRepos {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Mailer that records every mail and can be switched to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let mailer = Self::default();
        mailer.failing.store(true, Ordering::SeqCst);
        Arc::new(mailer)
    }

    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Transport("relay unavailable".to_string()));
        }
        self.sent.lock().await.push(mail);
        Ok(())
    }
}

pub fn identity() -> MailIdentity {
    MailIdentity {
        from: FROM_EMAIL.to_string(),
        admin: ADMIN_EMAIL.to_string(),
    }
}

pub fn cache_on() -> CacheOptions {
    CacheOptions {
        enabled: true,
        ttl: Duration::from_secs(60),
    }
}

pub fn catalog_service(repos: &Arc<MemoryRepos>, cache: CacheOptions) -> CatalogService {
    CatalogService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        Arc::new(MemorySnapshotStore::<ProductRecord>::new()),
        cache,
    )
}

pub fn blog_service(
    repos: &Arc<MemoryRepos>,
    mailer: Arc<dyn Mailer>,
    threshold: i64,
) -> BlogService {
    BlogService::new(
        repos.clone(),
        Arc::new(MemorySnapshotStore::<PostRecord>::new()),
        cache_on(),
        MilestoneNotifier::new(mailer, identity(), threshold),
    )
}

pub fn account_service(repos: &Arc<MemoryRepos>, mailer: Arc<dyn Mailer>) -> AccountService {
    AccountService::new(
        repos.clone(),
        SessionService::new(repos.clone(), time::Duration::hours(1)),
        mailer,
        identity(),
    )
}

pub fn http_state(repos: &Arc<MemoryRepos>, mailer: Arc<dyn Mailer>) -> HttpState {
    HttpState {
        catalog: Arc::new(catalog_service(repos, cache_on())),
        blog: Arc::new(blog_service(repos, mailer.clone(), 100)),
        accounts: Arc::new(account_service(repos, mailer)),
        health: repos.clone(),
    }
}

/// Insert a user directly and return the matching actor.
pub async fn user(
    repos: &Arc<MemoryRepos>,
    email: &str,
    is_staff: bool,
    is_superuser: bool,
) -> (UserRecord, Actor) {
    let user = repos
        .create_user(CreateUserParams {
            email: email.to_string(),
            password_hash: hash_password("s3cret-pass").expect("hash"),
            first_name: String::new(),
            last_name: String::new(),
            avatar: None,
            phone: String::new(),
            country: String::new(),
            is_staff,
            is_superuser,
        })
        .await
        .expect("user");
    let permissions = repos.effective_permissions(user.id).await.expect("grants");
    let actor = Actor::for_user(&user, permissions);
    (user, actor)
}

pub async fn category(repos: &Arc<MemoryRepos>, name: &str) -> CategoryRecord {
    repos.create_category(name, "").await.expect("category")
}

pub async fn product(
    repos: &Arc<MemoryRepos>,
    category_id: Uuid,
    name: &str,
    is_published: bool,
    owner_id: Option<Uuid>,
) -> ProductRecord {
    repos
        .create_product(
            ProductParams {
                name: name.to_string(),
                description: String::new(),
                image: None,
                category_id,
                price_minor: 1_000,
                is_published,
            },
            owner_id,
        )
        .await
        .expect("product")
}

pub async fn post(
    repos: &Arc<MemoryRepos>,
    title: &str,
    is_published: bool,
    owner_id: Option<Uuid>,
) -> PostRecord {
    repos
        .create_post(
            PostParams {
                title: title.to_string(),
                content: "Body".to_string(),
                preview: None,
                is_published,
            },
            owner_id,
        )
        .await
        .expect("post")
}
