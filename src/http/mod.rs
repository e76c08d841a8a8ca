use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::AppState;

pub mod auth;
mod error;
mod handlers;
mod middleware;
mod routes;

pub use auth::{AuthUser, CurrentSession, MaybeAuthUser};
pub use error::{AppError, Found};

const MAX_FORM_BYTES: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::users())
        .merge(routes::messages())
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::recent_url::track_recent_url,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::ip_rate_limit_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES))
        .with_state(state)
}
