use axum::{http::Method, middleware::from_fn_with_state, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod conversation;
pub mod error;
pub mod flights;
pub mod handoff;
pub mod health;
pub mod helper;
pub mod location;
pub mod metrics;
pub mod middleware;
pub mod reminders;
pub mod reservations;
pub mod state;
pub mod voice;
pub mod webhooks;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let api = Router::new()
        .merge(conversation::routes())
        .merge(reservations::routes())
        .merge(flights::routes())
        .merge(voice::routes())
        .merge(helper::routes())
        .merge(location::routes())
        .merge(reminders::routes())
        .merge(handoff::routes(state.clone()))
        .merge(webhooks::routes());

    Router::new()
        .nest("/api", api)
        .merge(health::routes())
        .route_layer(from_fn_with_state(state.clone(), metrics::track_requests))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(state.clone(), middleware::rate_limit_middleware))
        .with_state(state)
}
