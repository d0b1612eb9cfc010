//! Catalog handlers

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::domain::actor::Actor;
use crate::infra::http::error::ApiError;
use crate::infra::http::models::{
    CategoryListing, CategoryRequest, ContactRequest, MessageResponse, ProductRequest,
    PublicationRequest,
};
use crate::infra::http::state::HttpState;

pub async fn home(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state.catalog.home(&actor).await?;
    Ok(Json(products.to_vec()))
}

pub async fn get_product(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.product(&actor, id).await?))
}

pub async fn create_product(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .catalog
        .create_product(&actor, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .catalog
        .update_product(&actor, id, payload.into())
        .await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.catalog.delete_product(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unpublish_product(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.unpublish_product(&actor, id).await?))
}

pub async fn set_publication(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<PublicationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .catalog
        .set_products_published(&actor, &payload.ids, payload.is_published)
        .await?;
    Ok(Json(updated))
}

pub async fn list_categories(
    State(state): State<HttpState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.categories().await?))
}

pub async fn create_category(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .catalog
        .create_category(&actor, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn category_products(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (category, products) = state.catalog.products_in_category(id).await?;
    Ok(Json(CategoryListing {
        category,
        products: products.to_vec(),
    }))
}

pub async fn list_contacts(
    State(state): State<HttpState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.company_contacts().await?))
}

pub async fn submit_contact(
    State(state): State<HttpState>,
    Json(payload): Json<ContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.catalog.submit_contact_form(payload.into())?;
    Ok(Json(MessageResponse { message }))
}
