use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::app::session::Session;
use crate::app::users::UserService;
use crate::domain::user::User;
use crate::http::AppError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "warbler_session";

/// The decoded session cookie; empty when absent or invalid.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Session);

/// The logged-in user. Rejects with the "Access unauthorized." redirect.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> uuid::Uuid {
        self.user.id
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        read_session(&jar, state).map(CurrentSession)
    }
}

/// The logged-in user when there is one. Only a missing or stale session
/// reads as anonymous; lookup failures still reject with a 500.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_user(parts, state)
            .await?
            .ok_or_else(AppError::access_unauthorized)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_user(parts, state).await.map(MaybeAuthUser)
    }
}

async fn session_user(parts: &mut Parts, state: &AppState) -> Result<Option<AuthUser>, AppError> {
    let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
    let Some(user_id) = session.user_id else {
        return Ok(None);
    };

    let service = UserService::new(state.db.clone());
    let user = service.get_user(user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %user_id, "failed to load session user");
        AppError::internal("failed to load session user")
    })?;

    // The account may have been deleted since the cookie was issued.
    Ok(user.map(|user| AuthUser { user }))
}

pub fn read_session(jar: &CookieJar, state: &AppState) -> Result<Session, AppError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(Session::default());
    };
    state.sessions.open(cookie.value()).map_err(|err| {
        tracing::error!(error = ?err, "failed to open session cookie");
        AppError::internal("failed to read session")
    })
}

/// Returns `jar` with the session cookie replaced by `session`.
pub fn store_session(
    jar: CookieJar,
    state: &AppState,
    session: &Session,
) -> Result<CookieJar, AppError> {
    let token = state.sessions.seal(session).map_err(|err| {
        tracing::error!(error = ?err, "failed to seal session cookie");
        AppError::internal("failed to write session")
    })?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.session_cookie_secure)
        .max_age(time::Duration::hours(state.sessions.ttl_hours() as i64));

    Ok(jar.add(cookie))
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
