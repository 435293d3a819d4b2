pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod services;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post, put},
};
use sqlx::SqlitePool;
use std::{sync::Arc, time::Instant};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/feed.xml", get(handlers::feeds::site_feed))
        .route("/c/{id}/feed.xml", get(handlers::feeds::community_feed))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route(
            "/api/auth/forgot-password",
            post(handlers::auth::forgot_password),
        )
        .route(
            "/api/auth/password-resets/{token}",
            get(handlers::auth::reset_status),
        )
        .route(
            "/api/auth/password-resets/{token}/verify",
            post(handlers::auth::verify_reset_code),
        )
        .route(
            "/api/auth/password-resets/{token}/reset",
            post(handlers::auth::reset_password),
        )
        .route("/api/posts", get(handlers::posts::get_feed))
        .route(
            "/api/users/{username}",
            get(handlers::users::get_user_profile),
        )
        .route("/api/search", get(handlers::search::search))
        .route("/api/share/{post_id}", get(handlers::posts::share_post))
        .route(
            "/api/notifications/count",
            get(handlers::notifications::get_unread_count),
        );

    // Protected routes; paths shared with public reads carry both methods here
    let protected_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        // User routes
        .route(
            "/api/users/me",
            get(handlers::users::get_current_user).put(handlers::users::update_current_user),
        )
        .route(
            "/api/users/me/bookmarks",
            get(handlers::users::get_bookmarks),
        )
        .route(
            "/api/notifications",
            get(handlers::notifications::get_notifications),
        )
        // Community routes
        .route(
            "/api/communities",
            get(handlers::communities::get_communities)
                .post(handlers::communities::create_community),
        )
        .route(
            "/api/communities/{id}",
            get(handlers::communities::get_community)
                .put(handlers::communities::update_community),
        )
        .route(
            "/api/communities/{id}/settings",
            get(handlers::communities::get_community_settings),
        )
        .route(
            "/api/communities/{id}/follow",
            post(handlers::communities::follow_community),
        )
        .route(
            "/api/communities/{id}/admins",
            post(handlers::communities::add_admin),
        )
        .route(
            "/api/communities/{id}/admins/{user_id}",
            delete(handlers::communities::remove_admin),
        )
        .route(
            "/api/communities/{id}/posts",
            get(handlers::communities::get_community_posts)
                .post(handlers::communities::create_post),
        )
        .route(
            "/api/communities/{id}/posts/{post_id}",
            delete(handlers::communities::admin_delete_post),
        )
        .route(
            "/api/communities/{id}/reports/{report_id}/resolve",
            post(handlers::communities::resolve_report),
        )
        // Post routes
        .route(
            "/api/posts/{post_id}",
            get(handlers::posts::get_post)
                .put(handlers::posts::update_post)
                .delete(handlers::posts::delete_post),
        )
        .route(
            "/api/posts/{post_id}/vote",
            post(handlers::posts::vote_post),
        )
        .route(
            "/api/posts/{post_id}/bookmark",
            post(handlers::posts::bookmark_post),
        )
        .route(
            "/api/posts/{post_id}/report",
            post(handlers::posts::report_post),
        )
        .route(
            "/api/posts/{post_id}/comments",
            post(handlers::posts::create_comment),
        )
        // Comment routes
        .route(
            "/api/comments/{comment_id}",
            put(handlers::comments::update_comment).delete(handlers::comments::delete_comment),
        )
        .route(
            "/api/comments/{comment_id}/vote",
            post(handlers::comments::vote_comment),
        )
        .route(
            "/api/comments/{comment_id}/report",
            post(handlers::comments::report_comment),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
