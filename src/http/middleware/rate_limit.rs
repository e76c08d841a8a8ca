use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;

use crate::app::rate_limiter::RateLimiter;
use crate::http::AppError;
use crate::AppState;

/// IP-based rate limiting for the credential forms (login, signup)
pub async fn ip_rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let action = match (request.uri().path(), request.method().as_str()) {
        ("/login", "POST") => "login",
        ("/signup", "POST") => "signup",
        _ => return Ok(next.run(request).await),
    };
    let Some((limit, window)) = state.rate_limits.for_action(action) else {
        return Ok(next.run(request).await);
    };

    // Requests served without connect info (in-process callers) are not throttled.
    let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>().copied()
    else {
        return Ok(next.run(request).await);
    };

    let ip = addr.ip().to_string();
    let rate_limiter = RateLimiter::new(state.cache.clone());

    let is_limited = rate_limiter
        .hit_ip(&ip, action, limit, window)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to check IP rate limit");
            AppError::internal("failed to check rate limit")
        })?;

    if is_limited {
        tracing::warn!(ip = ip, action = action, "IP rate limit exceeded");
        return Err(AppError::rate_limited(
            "Too many attempts from your IP address. Please try again later.",
        ));
    }

    Ok(next.run(request).await)
}
