//! Blog use cases: cached listing, counted views and post CRUD.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::notify::MilestoneNotifier;
use crate::application::repos::{PostParams, PostsRepo, RepoError, Visibility};
use crate::cache::{BLOG_POSTS, CacheKeyring, CacheOptions, ListingCache, SnapshotStore};
use crate::domain::actor::{Actor, Permission};
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::policy::{
    AccessDenied, Gate, authorize, authorize_actor, can_view, edit_gates,
};
use crate::domain::validation::{
    POST_TITLE_MAX_CHARS, ValidationErrors, check_banned_words, check_image_reference,
    check_max_chars, check_required,
};

#[derive(Debug, Error)]
pub enum BlogError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Access(#[from] AccessDenied),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<ValidationErrors> for BlogError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Domain(DomainError::Validation(errors))
    }
}

#[derive(Debug, Clone)]
pub struct PostCommand {
    pub title: String,
    pub content: String,
    pub preview: Option<String>,
    /// `None` keeps the stored flag on update and means draft on create.
    pub is_published: Option<bool>,
}

#[derive(Clone)]
pub struct BlogService {
    posts: Arc<dyn PostsRepo>,
    listing: ListingCache<PostRecord>,
    notifier: MilestoneNotifier,
}

impl BlogService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        store: Arc<dyn SnapshotStore<PostRecord>>,
        cache: CacheOptions,
        notifier: MilestoneNotifier,
    ) -> Self {
        Self {
            posts,
            listing: ListingCache::new(
                CacheKeyring::new(BLOG_POSTS),
                store,
                cache.enabled,
                cache.ttl,
            ),
            notifier,
        }
    }

    pub async fn list_posts(&self, actor: &Actor) -> Result<Arc<[PostRecord]>, BlogError> {
        let is_staff = actor.sees_unpublished();
        let posts = Arc::clone(&self.posts);
        let listing = self
            .listing
            .list(is_staff, || async move {
                posts.list_posts(Visibility::for_staff(is_staff)).await
            })
            .await?;
        Ok(listing)
    }

    /// Count a view and return the post with the fresh counter.
    ///
    /// The milestone check runs on the committed before/after pair; a mail
    /// failure never fails the view.
    pub async fn view_post(&self, actor: &Actor, id: Uuid) -> Result<PostRecord, BlogError> {
        let mut post = self.load_post(id).await?;
        if !can_view(actor, &post) {
            return Err(DomainError::not_found("post").into());
        }

        let change = match self.posts.increment_views(id).await {
            Ok(change) => change,
            Err(RepoError::NotFound) => return Err(DomainError::not_found("post").into()),
            Err(err) => return Err(err.into()),
        };
        post.views_count = change.current;

        self.notifier.on_views_changed(&post, change).await;
        Ok(post)
    }

    pub async fn create_post(
        &self,
        actor: &Actor,
        cmd: PostCommand,
    ) -> Result<PostRecord, BlogError> {
        authorize_actor(actor, &[Gate::LoginRequired])?;
        let is_published = cmd.is_published.unwrap_or(false);
        let params = validate_post(cmd, is_published)?;

        let post = self.posts.create_post(params, actor.id).await?;
        self.listing.invalidate();

        info!(
            target = "skystore::blog",
            post_id = %post.id,
            actor = %actor.label(),
            "post created"
        );
        Ok(post)
    }

    pub async fn update_post(
        &self,
        actor: &Actor,
        id: Uuid,
        cmd: PostCommand,
    ) -> Result<PostRecord, BlogError> {
        authorize_actor(actor, &[Gate::LoginRequired])?;
        let current = self.load_post(id).await?;
        let is_published = cmd.is_published.unwrap_or(current.is_published);
        let gates = edit_gates(current.is_published, is_published, Permission::UnpublishPost);
        authorize(actor, Some(&current), &gates)?;
        let params = validate_post(cmd, is_published)?;

        let post = self.posts.update_post(id, params).await?;
        self.listing.invalidate();

        info!(
            target = "skystore::blog",
            post_id = %id,
            actor = %actor.label(),
            "post updated"
        );
        Ok(post)
    }

    pub async fn delete_post(&self, actor: &Actor, id: Uuid) -> Result<(), BlogError> {
        authorize_actor(actor, &[Gate::LoginRequired])?;
        let current = self.load_post(id).await?;
        authorize(actor, Some(&current), &[Gate::CanDelete(Permission::DeletePost)])?;

        self.posts.delete_post(id).await?;
        self.listing.invalidate();

        info!(
            target = "skystore::blog",
            post_id = %id,
            actor = %actor.label(),
            "post deleted"
        );
        Ok(())
    }

    pub async fn unpublish_post(&self, actor: &Actor, id: Uuid) -> Result<PostRecord, BlogError> {
        authorize_actor(actor, &[Gate::LoginRequired])?;
        let current = self.load_post(id).await?;
        authorize(
            actor,
            Some(&current),
            &[Gate::CanUnpublish(Permission::UnpublishPost)],
        )?;

        let post = self.posts.set_post_published(id, false).await?;
        self.listing.invalidate();

        info!(
            target = "skystore::blog",
            post_id = %id,
            actor = %actor.label(),
            "post unpublished"
        );
        Ok(post)
    }

    async fn load_post(&self, id: Uuid) -> Result<PostRecord, BlogError> {
        self.posts
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post").into())
    }
}

fn validate_post(cmd: PostCommand, is_published: bool) -> Result<PostParams, ValidationErrors> {
    let title = cmd.title.trim().to_string();
    let preview = cmd
        .preview
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "title", &title);
    check_max_chars(&mut errors, "title", &title, POST_TITLE_MAX_CHARS);
    check_banned_words(&mut errors, "title", "Title", &title);
    check_required(&mut errors, "content", &cmd.content);
    check_banned_words(&mut errors, "content", "Content", &cmd.content);
    check_image_reference(&mut errors, "preview", preview.as_deref());
    errors.into_result()?;

    Ok(PostParams {
        title,
        content: cmd.content,
        preview,
        is_published,
    })
}
