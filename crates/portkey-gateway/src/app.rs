use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use tracing::Level;

use crate::csrf::csrf_guard;
use crate::handlers::{
    analytics_handler, create_url_handler, current_user_handler, delete_url_handler,
    health_handler, list_urls_handler, redirect_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        let api = Router::new()
            .route("/urls/", get(list_urls_handler))
            .route("/urls/create/", post(create_url_handler))
            .route("/urls/{id}/analytics/", get(analytics_handler))
            .route("/urls/{id}/delete/", delete(delete_url_handler))
            .route_layer(middleware::from_fn(csrf_guard));

        Router::new()
            .route("/health", get(health_handler))
            .route("/accounts/me/", get(current_user_handler))
            .route("/s/{code}", get(redirect_handler))
            .route("/{code}", get(redirect_handler))
            .nest("/api", api)
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                    .on_response(DefaultOnResponse::new().level(Level::INFO))
                    .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
            )
            .with_state(state)
    }
}
