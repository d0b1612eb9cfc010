//! Blog handlers

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::domain::actor::Actor;
use crate::infra::http::error::ApiError;
use crate::infra::http::models::PostRequest;
use crate::infra::http::state::HttpState;

pub async fn list_posts(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.blog.list_posts(&actor).await?;
    Ok(Json(posts.to_vec()))
}

/// Detail view; each successful call counts one view.
pub async fn view_post(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.blog.view_post(&actor, id).await?))
}

pub async fn create_post(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<PostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.blog.create_post(&actor, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.blog.update_post(&actor, id, payload.into()).await?))
}

pub async fn delete_post(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.blog.delete_post(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unpublish_post(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.blog.unpublish_post(&actor, id).await?))
}
