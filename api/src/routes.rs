use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{admin_guard, auth_middleware, couple_guard};
use crate::state::AppState;

// Multipart framing and text fields on top of the file payloads
const BODY_LIMIT_SLACK_BYTES: usize = 1024 * 1024;

/// Create the main application router with all routes and middleware
#[tracing::instrument(skip(state))]
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload = &state.config.upload;
    let body_limit = upload
        .max_file_size_bytes
        .saturating_mul(upload.max_files_per_request)
        .saturating_add(BODY_LIMIT_SLACK_BYTES);
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::metrics::metrics_handler))
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh_token));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/logout/all", post(handlers::auth::logout_all))
        .route(
            "/user",
            get(handlers::user::get_me)
                .patch(handlers::user::update_me)
                .delete(handlers::user::delete_me),
        )
        .route("/user/profile-image", put(handlers::user::put_profile_image))
        .route("/couple", post(handlers::couple::create_couple))
        .route(
            "/inquiry",
            get(handlers::inquiry::list_my_inquiries).post(handlers::inquiry::create_inquiry),
        )
        .route(
            "/inquiry/:inquiry_id",
            get(handlers::inquiry::get_inquiry).delete(handlers::inquiry::delete_inquiry),
        )
        .route("/date/place", get(handlers::date_place::list_places))
        .route("/date/place/search", get(handlers::date_place::search_places))
        .route("/date/place/liked", get(handlers::date_place::list_liked))
        .route("/date/place/:content_id", get(handlers::date_place::get_place))
        .route(
            "/date/place/:content_id/like",
            post(handlers::date_place::like_place).delete(handlers::date_place::unlike_place),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Couple-scoped routes: the caller must belong to `:cup_id`
    let couple_routes = Router::new()
        .route(
            "/couple/:cup_id",
            get(handlers::couple::get_couple)
                .patch(handlers::couple::update_couple)
                .delete(handlers::couple::delete_couple),
        )
        .route("/couple/:cup_id/thumbnail", put(handlers::couple::put_thumbnail))
        .route(
            "/album/:cup_id",
            get(handlers::album::list_albums).post(handlers::album::create_album),
        )
        .route(
            "/album/:cup_id/:album_id",
            get(handlers::album::get_album)
                .patch(handlers::album::update_album)
                .delete(handlers::album::delete_album),
        )
        .route(
            "/album/:cup_id/:album_id/photos",
            post(handlers::album::add_photos).delete(handlers::album::delete_photos),
        )
        .route(
            "/calendar/:cup_id",
            get(handlers::calendar::list_events).post(handlers::calendar::create_event),
        )
        .route(
            "/calendar/:cup_id/:event_id",
            patch(handlers::calendar::update_event).delete(handlers::calendar::delete_event),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            couple_guard,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Admin routes
    let admin_routes = Router::new()
        .route("/admin/inquiry", get(handlers::admin::list_inquiries))
        .route(
            "/admin/inquiry/:inquiry_id/solution",
            post(handlers::admin::create_solution),
        )
        .route(
            "/admin/solution/:solution_id",
            patch(handlers::admin::update_solution).delete(handlers::admin::delete_solution),
        )
        .route_layer(axum::middleware::from_fn(admin_guard))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(couple_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(TimeoutLayer::new(request_timeout))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
