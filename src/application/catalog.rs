//! Catalog use cases: product listings, product CRUD, categories and contacts.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CategoriesRepo, ContactsRepo, ProductParams, ProductsRepo, RepoError, Visibility,
};
use crate::cache::{
    CATEGORY_PRODUCTS, CacheKeyring, CacheOptions, HOME_PRODUCTS, ListingCache, SlotKey,
    SnapshotStore,
};
use crate::domain::actor::{Actor, Permission};
use crate::domain::entities::{CategoryRecord, ContactRecord, ProductRecord};
use crate::domain::error::DomainError;
use crate::domain::policy::{
    AccessDenied, Gate, authorize, authorize_actor, can_view, edit_gates,
};
use crate::domain::validation::{
    CATEGORY_NAME_MAX_CHARS, CONTACT_NAME_MAX_CHARS, CONTACT_PHONE_MAX_CHARS,
    PRODUCT_NAME_MAX_CHARS, ValidationErrors, check_banned_words, check_image_reference,
    check_max_chars, check_price, check_required,
};

const LOGIN: &[Gate] = &[Gate::LoginRequired];
const STAFF: &[Gate] = &[Gate::LoginRequired, Gate::StaffRequired];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Access(#[from] AccessDenied),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<ValidationErrors> for CatalogError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Domain(DomainError::Validation(errors))
    }
}

#[derive(Debug, Clone)]
pub struct ProductCommand {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub category_id: Uuid,
    pub price_minor: i64,
    /// `None` keeps the stored flag on update and means draft on create.
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct CategoryCommand {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct ContactForm {
    pub name: String,
    pub phone: String,
    pub message: String,
}

#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    contacts: Arc<dyn ContactsRepo>,
    home: ListingCache<ProductRecord>,
    by_category: ListingCache<ProductRecord>,
}

impl CatalogService {
    pub fn new(
        products: Arc<dyn ProductsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        contacts: Arc<dyn ContactsRepo>,
        store: Arc<dyn SnapshotStore<ProductRecord>>,
        cache: CacheOptions,
    ) -> Self {
        let home = ListingCache::new(
            CacheKeyring::new(HOME_PRODUCTS),
            Arc::clone(&store),
            cache.enabled,
            cache.ttl,
        );
        let by_category = ListingCache::new(
            CacheKeyring::new(CATEGORY_PRODUCTS),
            store,
            cache.enabled,
            cache.ttl,
        );
        Self {
            products,
            categories,
            contacts,
            home,
            by_category,
        }
    }

    /// Home listing; drafts are included for staff only.
    pub async fn home(&self, actor: &Actor) -> Result<Arc<[ProductRecord]>, CatalogError> {
        let is_staff = actor.sees_unpublished();
        let products = Arc::clone(&self.products);
        let listing = self
            .home
            .list(is_staff, || async move {
                products.list_products(Visibility::for_staff(is_staff)).await
            })
            .await?;
        Ok(listing)
    }

    /// Published products of one category.
    pub async fn products_in_category(
        &self,
        category_id: Uuid,
    ) -> Result<(CategoryRecord, Arc<[ProductRecord]>), CatalogError> {
        let category = self
            .categories
            .find_category(category_id)
            .await?
            .ok_or_else(|| DomainError::not_found("category"))?;

        let products = Arc::clone(&self.products);
        let key = SlotKey::scoped(CATEGORY_PRODUCTS, category_id);
        let listing = self
            .by_category
            .fetch(&key, || async move {
                products
                    .list_products_in_category(category_id, Visibility::PublishedOnly)
                    .await
            })
            .await?;
        Ok((category, listing))
    }

    /// Missing and invisible products are both reported as not found.
    pub async fn product(&self, actor: &Actor, id: Uuid) -> Result<ProductRecord, CatalogError> {
        let product = self.load_product(id).await?;
        if !can_view(actor, &product) {
            return Err(DomainError::not_found("product").into());
        }
        Ok(product)
    }

    pub async fn create_product(
        &self,
        actor: &Actor,
        cmd: ProductCommand,
    ) -> Result<ProductRecord, CatalogError> {
        authorize_actor(actor, LOGIN)?;
        let is_published = cmd.is_published.unwrap_or(false);
        let params = self.validate_product(cmd, is_published).await?;

        let product = self.products.create_product(params, actor.id).await?;
        self.invalidate_listings(&[product.category_id]);

        info!(
            target = "skystore::catalog",
            product_id = %product.id,
            actor = %actor.label(),
            "product created"
        );
        Ok(product)
    }

    pub async fn update_product(
        &self,
        actor: &Actor,
        id: Uuid,
        cmd: ProductCommand,
    ) -> Result<ProductRecord, CatalogError> {
        authorize_actor(actor, LOGIN)?;
        let current = self.load_product(id).await?;
        let is_published = cmd.is_published.unwrap_or(current.is_published);
        let gates = edit_gates(
            current.is_published,
            is_published,
            Permission::UnpublishProduct,
        );
        authorize(actor, Some(&current), &gates)?;
        let params = self.validate_product(cmd, is_published).await?;

        let updated = self.products.update_product(id, params).await?;
        self.invalidate_listings(&[current.category_id, updated.category_id]);

        info!(
            target = "skystore::catalog",
            product_id = %id,
            actor = %actor.label(),
            "product updated"
        );
        Ok(updated)
    }

    pub async fn delete_product(&self, actor: &Actor, id: Uuid) -> Result<(), CatalogError> {
        authorize_actor(actor, LOGIN)?;
        let current = self.load_product(id).await?;
        authorize(
            actor,
            Some(&current),
            &[Gate::CanDelete(Permission::DeleteProduct)],
        )?;

        self.products.delete_product(id).await?;
        self.invalidate_listings(&[current.category_id]);

        info!(
            target = "skystore::catalog",
            product_id = %id,
            actor = %actor.label(),
            "product deleted"
        );
        Ok(())
    }

    pub async fn unpublish_product(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<ProductRecord, CatalogError> {
        authorize_actor(actor, LOGIN)?;
        let current = self.load_product(id).await?;
        authorize(
            actor,
            Some(&current),
            &[Gate::CanUnpublish(Permission::UnpublishProduct)],
        )?;

        let updated = self.products.set_product_published(id, false).await?;
        self.invalidate_listings(&[updated.category_id]);

        info!(
            target = "skystore::catalog",
            product_id = %id,
            actor = %actor.label(),
            "product unpublished"
        );
        Ok(updated)
    }

    /// Staff bulk publish/unpublish. Unknown ids are ignored.
    pub async fn set_products_published(
        &self,
        actor: &Actor,
        ids: &[Uuid],
        is_published: bool,
    ) -> Result<Vec<ProductRecord>, CatalogError> {
        authorize_actor(actor, STAFF)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let updated = self
            .products
            .set_products_published(ids, is_published)
            .await?;
        let categories: Vec<Uuid> = updated.iter().map(|product| product.category_id).collect();
        self.invalidate_listings(&categories);

        info!(
            target = "skystore::catalog",
            count = updated.len(),
            is_published,
            actor = %actor.label(),
            "bulk publication change"
        );
        Ok(updated)
    }

    pub async fn categories(&self) -> Result<Vec<CategoryRecord>, CatalogError> {
        Ok(self.categories.list_categories().await?)
    }

    pub async fn create_category(
        &self,
        actor: &Actor,
        cmd: CategoryCommand,
    ) -> Result<CategoryRecord, CatalogError> {
        authorize_actor(actor, STAFF)?;

        let name = cmd.name.trim();
        let mut errors = ValidationErrors::new();
        check_required(&mut errors, "name", name);
        check_max_chars(&mut errors, "name", name, CATEGORY_NAME_MAX_CHARS);
        errors.into_result()?;

        match self
            .categories
            .create_category(name, cmd.description.trim())
            .await
        {
            Ok(category) => Ok(category),
            Err(RepoError::Duplicate { .. }) => Err(ValidationErrors::single(
                "name",
                "Category with this name already exists.",
            )
            .into()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn company_contacts(&self) -> Result<Vec<ContactRecord>, CatalogError> {
        Ok(self.contacts.list_contacts().await?)
    }

    /// Validate the feedback form and return the confirmation text. Nothing is stored.
    pub fn submit_contact_form(&self, form: ContactForm) -> Result<String, CatalogError> {
        let name = form.name.trim();
        let phone = form.phone.trim();

        let mut errors = ValidationErrors::new();
        check_required(&mut errors, "name", name);
        check_max_chars(&mut errors, "name", name, CONTACT_NAME_MAX_CHARS);
        check_required(&mut errors, "phone", phone);
        check_max_chars(&mut errors, "phone", phone, CONTACT_PHONE_MAX_CHARS);
        check_required(&mut errors, "message", &form.message);
        errors.into_result()?;

        Ok(format!("Thank you, {name}! We will contact you by phone at {phone}."))
    }

    async fn load_product(&self, id: Uuid) -> Result<ProductRecord, CatalogError> {
        self.products
            .find_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product").into())
    }

    async fn validate_product(
        &self,
        cmd: ProductCommand,
        is_published: bool,
    ) -> Result<ProductParams, CatalogError> {
        let name = cmd.name.trim().to_string();
        let description = cmd.description.trim().to_string();
        let image = cmd
            .image
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let mut errors = ValidationErrors::new();
        check_required(&mut errors, "name", &name);
        check_max_chars(&mut errors, "name", &name, PRODUCT_NAME_MAX_CHARS);
        check_banned_words(&mut errors, "name", "Name", &name);
        check_banned_words(&mut errors, "description", "Description", &description);
        check_price(&mut errors, "price_minor", cmd.price_minor);
        check_image_reference(&mut errors, "image", image.as_deref());

        if self.categories.find_category(cmd.category_id).await?.is_none() {
            errors.add("category_id", "Select a valid category.");
        }
        errors.into_result()?;

        Ok(ProductParams {
            name,
            description,
            image,
            category_id: cmd.category_id,
            price_minor: cmd.price_minor,
            is_published,
        })
    }

    fn invalidate_listings(&self, category_ids: &[Uuid]) {
        self.home.invalidate();
        let mut seen: Vec<Uuid> = Vec::with_capacity(category_ids.len());
        for id in category_ids {
            if seen.contains(id) {
                continue;
            }
            seen.push(*id);
            self.by_category
                .invalidate_key(&SlotKey::scoped(CATEGORY_PRODUCTS, id));
        }
    }
}
