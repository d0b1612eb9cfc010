//! JSON HTTP surface.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
mod state;

pub use state::HttpState;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::application::error::ErrorReport;

use handlers::{accounts, blog, catalog};
use middleware::{log_responses, resolve_actor, set_request_context};

pub fn build_router(state: HttpState) -> Router {
    let actor_state = state.clone();

    Router::new()
        .route("/", get(catalog::home))
        .route("/products", post(catalog::create_product))
        .route("/products/publication", post(catalog::set_publication))
        .route(
            "/products/{id}",
            get(catalog::get_product)
                .patch(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route("/products/{id}/unpublish", post(catalog::unpublish_product))
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route("/categories/{id}/products", get(catalog::category_products))
        .route(
            "/contacts",
            get(catalog::list_contacts).post(catalog::submit_contact),
        )
        .route("/blog", get(blog::list_posts).post(blog::create_post))
        .route(
            "/blog/{id}",
            get(blog::view_post)
                .patch(blog::update_post)
                .delete(blog::delete_post),
        )
        .route("/blog/{id}/unpublish", post(blog::unpublish_post))
        .route("/users/register", post(accounts::register))
        .route("/users/login", post(accounts::login))
        .route("/users/logout", post(accounts::logout))
        .route(
            "/users/profile",
            get(accounts::profile).patch(accounts::update_profile),
        )
        .route("/users/delete", post(accounts::delete_account))
        .route("/_health/db", get(db_health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn_with_state(
            actor_state,
            resolve_actor,
        ))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn db_health(State(state): State<HttpState>) -> Response {
    match state.health.ping().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
