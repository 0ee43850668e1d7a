//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api`. Reads are public; article, category
//! and tag writes pass through `require_auth`.

pub mod articles;
pub mod auth;
pub mod categories;
pub mod common;
pub mod middleware;
pub mod site;
pub mod tags;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .route(
            "/article",
            axum::routing::post(articles::create_article_handler)
                .put(articles::update_article_handler)
                .delete(articles::delete_article_handler),
        )
        .merge(categories::protected_routes())
        .merge(tags::protected_routes())
        .merge(auth::protected_routes())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .route("/articles", get(articles::list_articles_handler))
        .route("/articles/category", get(articles::list_by_category_handler))
        .route("/articles/tag", get(articles::list_by_tag_handler))
        .route("/article", get(articles::get_article_handler))
        .merge(categories::public_routes())
        .merge(tags::public_routes())
        .merge(auth::public_routes())
        .merge(site::router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let origin = match cors_origin.parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!(cors_origin, "Invalid CORS origin, allowing any origin");
            AllowOrigin::any()
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
