// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, engagement, posts, topic},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Register and login are public.
/// * Token refresh/revoke and everything under `/api/topics` require a
///   bearer token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let session_routes = Router::new()
        .route("/refresh", post(auth::refresh))
        .route("/revoke", post(auth::revoke))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(session_routes);

    let topic_routes = Router::new()
        .route("/", get(topic::list_topics))
        .route("/{topic}", get(topic::get_topic))
        .route(
            "/{topic}/posts",
            get(posts::list_posts).post(posts::create_post),
        )
        .route("/{topic}/posts/{post_id}", get(posts::get_post))
        .route(
            "/{topic}/posts/{post_id}/ratings",
            get(engagement::list_ratings).post(engagement::create_rating),
        )
        .route(
            "/{topic}/posts/{post_id}/comments",
            get(engagement::list_comments).post(engagement::create_comment),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/topics", topic_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
