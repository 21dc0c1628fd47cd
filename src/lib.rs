pub mod auth;
pub mod comment_tree;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod redis;
pub mod score;
pub mod services;
pub mod store;
pub mod vote_widget;

use axum::{
    Router,
    http::{
        HeaderName, HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    response::Json,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    events::EventSink,
    identity::{DEVICE_ID_HEADER, DISPLAY_NAME_HEADER},
    redis::KeyValueCache,
    store::DocumentStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub cache: Arc<dyn KeyValueCache>,
    pub events: Arc<dyn EventSink>,
    pub config: Arc<Config>,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([
            AUTHORIZATION,
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static(DEVICE_ID_HEADER),
            HeaderName::from_static(DISPLAY_NAME_HEADER),
        ]);

    // Public routes (device identity only)
    let public_routes = Router::new()
        .route("/health", get(health))
        // Post routes
        .route(
            "/api/posts",
            get(handlers::posts::list_posts).post(handlers::posts::create_post),
        )
        .route("/api/posts/{post_id}", get(handlers::posts::get_post))
        .route(
            "/api/posts/{post_id}/comments",
            get(handlers::posts::get_post_comments),
        )
        .route(
            "/api/posts/{post_id}/vote",
            get(handlers::posts::get_post_vote).post(handlers::posts::vote_post),
        )
        // Comment routes
        .route("/api/comments", post(handlers::comments::create_comment))
        .route(
            "/api/comments/{comment_id}/vote",
            get(handlers::comments::get_comment_vote).post(handlers::comments::vote_comment),
        )
        // Submission routes
        .route("/api/submit", post(handlers::submissions::submit_video))
        .route("/api/videos", get(handlers::submissions::list_videos))
        .route(
            "/api/nepo-kids/submit",
            post(handlers::submissions::submit_nepo_entry),
        )
        .route(
            "/api/nepo-kids",
            get(handlers::submissions::list_nepo_entries),
        )
        .route(
            "/api/nepo-kids/search",
            get(handlers::submissions::search_nepo_entries),
        )
        .route("/api/admin/login", post(handlers::admin::login))
        .route("/api/admin/verify", post(handlers::admin::verify));

    // Admin routes
    let admin_routes = Router::new()
        .route("/api/admin/logout", post(handlers::admin::logout))
        .route("/api/admin/videos", get(handlers::admin::list_videos))
        .route(
            "/api/admin/videos/{id}/status",
            put(handlers::admin::update_video_status),
        )
        .route(
            "/api/admin/nepo-kids",
            get(handlers::admin::list_nepo_entries),
        )
        .route(
            "/api/admin/nepo-kids/{id}/status",
            put(handlers::admin::update_nepo_entry_status),
        )
        .route("/api/admin/stats", get(handlers::admin::stats));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
