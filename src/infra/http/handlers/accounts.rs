//! Account handlers

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::domain::actor::Actor;
use crate::infra::http::error::ApiError;
use crate::infra::http::middleware::SessionToken;
use crate::infra::http::models::{
    DeleteAccountRequest, LoginRequest, ProfileRequest, RegisterRequest, SessionResponse,
};
use crate::infra::http::state::HttpState;

pub async fn register(
    State(state): State<HttpState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let signed_in = state.accounts.register(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(signed_in))))
}

pub async fn login(
    State(state): State<HttpState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let signed_in = state.accounts.login(payload.into()).await?;
    Ok(Json(SessionResponse::from(signed_in)))
}

pub async fn logout(
    State(state): State<HttpState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = token {
        state.accounts.logout(&token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn profile(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.accounts.profile(&actor).await?))
}

pub async fn update_profile(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.accounts.update_profile(&actor, payload.into()).await?,
    ))
}

pub async fn delete_account(
    State(state): State<HttpState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.accounts.delete_account(&actor, payload.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}
