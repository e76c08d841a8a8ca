use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::http::auth::{read_session, store_session};
use crate::AppState;

const UNTRACKED_PATHS: &[&str] = &["/login", "/signup", "/logout", "/health"];

/// Remembers the last page the visitor viewed so that actions like
/// liking a message can send them back to it.
pub async fn track_recent_url(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let target = (request.method() == Method::GET
        && !UNTRACKED_PATHS.contains(&request.uri().path()))
    .then(|| {
        request
            .uri()
            .path_and_query()
            .map(|path| path.as_str().to_string())
    })
    .flatten();

    let response = next.run(request).await;

    let Some(target) = target else {
        return response;
    };
    // Never clobber a cookie the handler just wrote.
    if response.status() != StatusCode::OK || response.headers().contains_key(header::SET_COOKIE)
    {
        return response;
    }

    let mut session = match read_session(&jar, &state) {
        Ok(session) => session,
        Err(_) => return response,
    };
    if session.recent_url.as_deref() == Some(target.as_str()) {
        return response;
    }
    session.recent_url = Some(target);

    match store_session(jar, &state, &session) {
        Ok(jar) => (jar, response).into_response(),
        Err(_) => response,
    }
}
