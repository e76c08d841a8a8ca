use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::engagement::EngagementService;
use crate::app::messages::MessageService;
use crate::app::session::Session;
use crate::app::social::SocialService;
use crate::app::users::UserService;
use crate::domain::engagement::LikeToggle;
use crate::domain::message::{Message, MAX_MESSAGE_LEN};
use crate::domain::social_graph::{FollowEdge, RelationshipStatus};
use crate::domain::user::{ProfileUpdate, PublicUser, User, UserCounts};
use crate::http::auth::{
    clear_session, store_session, AuthUser, CurrentSession, MaybeAuthUser,
};
use crate::http::{AppError, Found};
use crate::infra::db::unique_violation;
use crate::AppState;

const MAX_USERNAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 128;
const DEFAULT_PAGE_LIMIT: i64 = 30;
const DEFAULT_FEED_LIMIT: i64 = 100;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// What a template would need to render a form.
#[derive(Serialize)]
pub struct FormPage {
    pub title: &'static str,
    pub action: &'static str,
    pub fields: &'static [&'static str],
}

#[derive(Serialize)]
pub struct MessageItem {
    #[serde(flatten)]
    pub message: Message,
    pub liked: bool,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

fn page_limit(limit: Option<i64>, default: i64) -> Result<i64, AppError> {
    let limit = limit.unwrap_or(default);
    if !(1..=200).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 200"));
    }
    Ok(limit)
}

/// Trims a `limit + 1` fetch back to `limit` and derives the next cursor
/// from the last item kept.
fn split_page<T>(
    mut items: Vec<T>,
    limit: i64,
    key: impl Fn(&T) -> (OffsetDateTime, Uuid),
) -> (Vec<T>, Option<String>) {
    if items.len() > limit as usize {
        items.truncate(limit as usize);
        let next = items.last().map(&key);
        (items, encode_cursor(next))
    } else {
        (items, None)
    }
}

async fn load_user_and_counts(
    state: &AppState,
    user_id: Uuid,
) -> Result<(User, UserCounts), AppError> {
    let service = UserService::new(state.db.clone());
    let user = service.get_user(user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %user_id, "failed to fetch user");
        AppError::internal("failed to fetch user")
    })?;
    let user = user.ok_or_else(|| AppError::not_found("user not found"))?;

    let counts = service.counts(user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %user_id, "failed to count user activity");
        AppError::internal("failed to fetch user")
    })?;

    Ok((user, counts))
}

async fn with_liked_flags(
    state: &AppState,
    viewer_id: Option<Uuid>,
    messages: Vec<Message>,
) -> Result<Vec<MessageItem>, AppError> {
    let liked = match viewer_id {
        Some(viewer_id) => {
            let ids: Vec<Uuid> = messages.iter().map(|message| message.id).collect();
            EngagementService::new(state.db.clone())
                .liked_among(viewer_id, &ids)
                .await
                .map_err(|err| {
                    tracing::error!(error = ?err, user_id = %viewer_id, "failed to load likes");
                    AppError::internal("failed to load likes")
                })?
        }
        None => Vec::new(),
    };

    Ok(messages
        .into_iter()
        .map(|message| MessageItem {
            liked: liked.contains(&message.id),
            message,
        })
        .collect())
}

/// Maps a username/email unique violation to a 409, anything else to a 500.
fn account_write_error(err: anyhow::Error, action: &'static str) -> AppError {
    if let Some(constraint) = unique_violation(&err) {
        if constraint.contains("username") {
            return AppError::conflict("Username already taken");
        }
        if constraint.contains("email") {
            return AppError::conflict("Email already taken");
        }
    }
    tracing::error!(error = ?err, action, "failed to write account");
    AppError::internal(format!("failed to {}", action))
}

fn validate_account_fields(username: &str, email: &str) -> Result<(), AppError> {
    if username.is_empty() {
        return Err(AppError::bad_request("username cannot be empty"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::bad_request("username must be at most 50 characters"));
    }
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::bad_request("invalid email address"));
    }
    Ok(())
}

/// Accepts an empty value, a site-relative path, or an absolute http(s) URL.
fn validate_image_url(field: &str, value: &str) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() || (value.starts_with('/') && !value.starts_with("//")) {
        return Ok(());
    }
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(AppError::bad_request(format!("{} must be a valid URL", field))),
    }
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

pub async fn not_found() -> AppError {
    AppError::not_found("page not found")
}

// ---------------------------------------------------------------------------
// Home
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct AnonymousHome {
    pub logged_in: bool,
    pub title: &'static str,
    pub links: &'static [&'static str],
}

#[derive(Serialize)]
pub struct HomeFeed {
    pub logged_in: bool,
    pub user: PublicUser,
    pub counts: UserCounts,
    pub messages: Vec<MessageItem>,
    pub next_cursor: Option<String>,
}

pub async fn home(
    MaybeAuthUser(auth): MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Response, AppError> {
    let Some(auth) = auth else {
        return Ok(Json(AnonymousHome {
            logged_in: false,
            title: "Happening?",
            links: &["Sign up", "Log in"],
        })
        .into_response());
    };

    let limit = page_limit(query.limit, DEFAULT_FEED_LIMIT)?;
    let cursor = parse_cursor(query.cursor)?;

    let messages = MessageService::new(state.db.clone())
        .home_feed(auth.id(), cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.id(), "failed to fetch home feed");
            AppError::internal("failed to fetch home feed")
        })?;
    let (messages, next_cursor) =
        split_page(messages, limit, |message| (message.timestamp, message.id));
    let messages = with_liked_flags(&state, Some(auth.id()), messages).await?;
    let (user, counts) = load_user_and_counts(&state, auth.id()).await?;

    Ok(Json(HomeFeed {
        logged_in: true,
        user: user.into(),
        counts,
        messages,
        next_cursor,
    })
    .into_response())
}

// ---------------------------------------------------------------------------
// Signup / login / logout
// ---------------------------------------------------------------------------

pub async fn signup_form() -> Json<FormPage> {
    Json(FormPage {
        title: "Join Warbler today.",
        action: "/signup",
        fields: &["username", "email", "password", "image_url"],
    })
}

#[derive(Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<(CookieJar, Found), AppError> {
    let username = form.username.trim();
    let email = form.email.trim();
    validate_account_fields(username, email)?;
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at least 6 characters"));
    }
    if form.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }
    let image_url = form.image_url.as_deref().map(str::trim);
    validate_image_url("image_url", image_url.unwrap_or_default())?;

    let service = AuthService::new(state.db.clone());
    let user = service
        .signup(username, email, &form.password, image_url)
        .await
        .map_err(|err| account_write_error(err, "create user"))?;

    tracing::info!(user_id = %user.id, "user signed up");
    let jar = store_session(jar, &state, &Session::for_user(user.id))?;
    Ok((jar, Found::to("/")))
}

pub async fn login_form() -> Json<FormPage> {
    Json(FormPage {
        title: "Welcome back.",
        action: "/login",
        fields: &["username", "password"],
    })
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Found), AppError> {
    if form.username.trim().is_empty() || form.password.is_empty() {
        return Err(AppError::bad_request("username and password are required"));
    }
    if form.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let service = AuthService::new(state.db.clone());
    let user = service
        .authenticate(form.username.trim(), &form.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match user {
        Some(user) => {
            tracing::info!(user_id = %user.id, "user logged in");
            let jar = store_session(jar, &state, &Session::for_user(user.id))?;
            Ok((jar, Found::to("/")))
        }
        None => Err(AppError::bad_request("Invalid credentials.")),
    }
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Found) {
    (clear_session(jar), Found::to("/login"))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct UserSearchQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<ListResponse<PublicUser>>, AppError> {
    let limit = page_limit(query.limit, DEFAULT_PAGE_LIMIT)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = UserService::new(state.db.clone());
    let users = service
        .list_users(query.q.as_deref(), cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list users");
            AppError::internal("failed to list users")
        })?;
    let (users, next_cursor) = split_page(users, limit, |user| (user.created_at, user.id));

    Ok(Json(ListResponse {
        items: users.into_iter().map(PublicUser::from).collect(),
        next_cursor,
    }))
}

#[derive(Serialize)]
pub struct UserPage {
    pub user: PublicUser,
    pub counts: UserCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<RelationshipStatus>,
    pub messages: Vec<MessageItem>,
    pub next_cursor: Option<String>,
}

pub async fn show_user(
    Path(id): Path<Uuid>,
    MaybeAuthUser(auth): MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<UserPage>, AppError> {
    let limit = page_limit(query.limit, DEFAULT_FEED_LIMIT)?;
    let cursor = parse_cursor(query.cursor)?;
    let (user, counts) = load_user_and_counts(&state, id).await?;
    let viewer_id = auth.as_ref().map(AuthUser::id);

    let relationship = match viewer_id {
        Some(viewer_id) if viewer_id != id => Some(
            SocialService::new(state.db.clone())
                .relationship_status(viewer_id, id)
                .await
                .map_err(|err| {
                    tracing::error!(error = ?err, user_id = %id, "failed to fetch relationship");
                    AppError::internal("failed to fetch user")
                })?,
        ),
        _ => None,
    };

    let messages = MessageService::new(state.db.clone())
        .list_user_messages(id, cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to list user messages");
            AppError::internal("failed to list user messages")
        })?;
    let (messages, next_cursor) =
        split_page(messages, limit, |message| (message.timestamp, message.id));
    let messages = with_liked_flags(&state, viewer_id, messages).await?;

    Ok(Json(UserPage {
        user: user.into(),
        counts,
        relationship,
        messages,
        next_cursor,
    }))
}

#[derive(Serialize)]
pub struct FollowListPage {
    pub user: PublicUser,
    pub counts: UserCounts,
    pub items: Vec<FollowEdge>,
    pub next_cursor: Option<String>,
}

pub async fn show_following(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<FollowListPage>, AppError> {
    let limit = page_limit(query.limit, DEFAULT_PAGE_LIMIT)?;
    let cursor = parse_cursor(query.cursor)?;
    let (user, counts) = load_user_and_counts(&state, id).await?;

    let following = SocialService::new(state.db.clone())
        .list_following(id, cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to list following");
            AppError::internal("failed to list following")
        })?;
    let (items, next_cursor) = split_page(following, limit, |edge| (edge.followed_at, edge.user.id));

    Ok(Json(FollowListPage {
        user: user.into(),
        counts,
        items,
        next_cursor,
    }))
}

pub async fn show_followers(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<FollowListPage>, AppError> {
    let limit = page_limit(query.limit, DEFAULT_PAGE_LIMIT)?;
    let cursor = parse_cursor(query.cursor)?;
    let (user, counts) = load_user_and_counts(&state, id).await?;

    let followers = SocialService::new(state.db.clone())
        .list_followers(id, cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to list followers");
            AppError::internal("failed to list followers")
        })?;
    let (items, next_cursor) = split_page(followers, limit, |edge| (edge.followed_at, edge.user.id));

    Ok(Json(FollowListPage {
        user: user.into(),
        counts,
        items,
        next_cursor,
    }))
}

#[derive(Serialize)]
pub struct LikedMessage {
    #[serde(flatten)]
    pub message: Message,
    #[serde(with = "time::serde::rfc3339")]
    pub liked_at: OffsetDateTime,
}

#[derive(Serialize)]
pub struct LikesPage {
    pub user: PublicUser,
    pub counts: UserCounts,
    pub items: Vec<LikedMessage>,
    pub next_cursor: Option<String>,
}

pub async fn show_likes(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<LikesPage>, AppError> {
    let limit = page_limit(query.limit, DEFAULT_PAGE_LIMIT)?;
    let cursor = parse_cursor(query.cursor)?;
    let (user, counts) = load_user_and_counts(&state, id).await?;

    let liked = EngagementService::new(state.db.clone())
        .list_liked_messages(id, cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to list liked messages");
            AppError::internal("failed to list liked messages")
        })?;
    let (liked, next_cursor) = split_page(liked, limit, |(message, liked_at)| (*liked_at, message.id));

    Ok(Json(LikesPage {
        user: user.into(),
        counts,
        items: liked
            .into_iter()
            .map(|(message, liked_at)| LikedMessage { message, liked_at })
            .collect(),
        next_cursor,
    }))
}

pub async fn follow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Found, AppError> {
    if auth.id() == id {
        return Err(AppError::bad_request("cannot follow yourself"));
    }

    let service = SocialService::new(state.db.clone());
    let followed = service.follow(auth.id(), id).await.map_err(|err| {
        if err.to_string().contains("user not found") {
            return AppError::not_found("user not found");
        }
        tracing::error!(error = ?err, follower_id = %auth.id(), followee_id = %id, "failed to follow user");
        AppError::internal("failed to follow user")
    })?;

    if followed {
        tracing::info!(follower_id = %auth.id(), followee_id = %id, "user followed");
    }
    Ok(Found::to(format!("/users/{}/following", auth.id())))
}

pub async fn stop_following(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Found, AppError> {
    let service = SocialService::new(state.db.clone());
    service.unfollow(auth.id(), id).await.map_err(|err| {
        tracing::error!(error = ?err, follower_id = %auth.id(), followee_id = %id, "failed to unfollow user");
        AppError::internal("failed to unfollow user")
    })?;

    Ok(Found::to(format!("/users/{}/following", auth.id())))
}

#[derive(Serialize)]
pub struct ProfilePage {
    pub title: &'static str,
    pub action: &'static str,
    pub user: User,
}

pub async fn profile_form(auth: AuthUser) -> Json<ProfilePage> {
    Json(ProfilePage {
        title: "Edit Your Profile.",
        action: "/users/profile",
        user: auth.user,
    })
}

#[derive(Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub password: String,
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<ProfileForm>,
) -> Result<Found, AppError> {
    let auth_service = AuthService::new(state.db.clone());
    let confirmed = auth_service
        .authenticate(&auth.user.username, &form.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.id(), "failed to confirm password");
            AppError::internal("failed to update profile")
        })?;
    if confirmed.is_none() {
        return Err(AppError::redirect("/", "Wrong password, please try again."));
    }

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();
    validate_account_fields(&username, &email)?;
    let image_url = form.image_url.unwrap_or_default().trim().to_string();
    let header_image_url = form.header_image_url.unwrap_or_default().trim().to_string();
    validate_image_url("image_url", &image_url)?;
    validate_image_url("header_image_url", &header_image_url)?;

    let update = ProfileUpdate {
        username,
        email,
        image_url,
        header_image_url,
        bio: form.bio,
        location: form.location,
    };

    let service = UserService::new(state.db.clone());
    let user = service
        .update_profile(auth.id(), update)
        .await
        .map_err(|err| account_write_error(err, "update profile"))?;

    match user {
        Some(user) => Ok(Found::to(format!("/users/{}", user.id))),
        None => Err(AppError::access_unauthorized()),
    }
}

pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Found), AppError> {
    let service = UserService::new(state.db.clone());
    let deleted = service.delete_account(auth.id()).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.id(), "failed to delete account");
        AppError::internal("failed to delete account")
    })?;

    if deleted {
        tracing::info!(user_id = %auth.id(), "account deleted");
    }
    Ok((clear_session(jar), Found::to("/signup")))
}

pub async fn toggle_like(
    Path(message_id): Path<Uuid>,
    auth: AuthUser,
    CurrentSession(session): CurrentSession,
    State(state): State<AppState>,
) -> Result<Found, AppError> {
    let service = EngagementService::new(state.db.clone());
    let outcome = service
        .toggle_like(auth.id(), message_id)
        .await
        .map_err(|err| {
            if err.to_string().contains("message not found") {
                return AppError::not_found("message not found");
            }
            tracing::error!(error = ?err, user_id = %auth.id(), message_id = %message_id, "failed to toggle like");
            AppError::internal("failed to toggle like")
        })?;

    tracing::debug!(
        user_id = %auth.id(),
        message_id = %message_id,
        liked = outcome == LikeToggle::Liked,
        "like toggled"
    );

    let target = session
        .recent_url
        .filter(|url| url.starts_with('/') && !url.starts_with("//"))
        .unwrap_or_else(|| "/".to_string());
    Ok(Found::to(target))
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

pub async fn new_message_form(_auth: AuthUser) -> Json<FormPage> {
    Json(FormPage {
        title: "Add my message!",
        action: "/messages/new",
        fields: &["text"],
    })
}

#[derive(Deserialize)]
pub struct MessageForm {
    pub text: String,
}

pub async fn create_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<MessageForm>,
) -> Result<Found, AppError> {
    let text = form.text.trim();
    if text.is_empty() {
        return Err(AppError::bad_request("text cannot be empty"));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::bad_request("text must be at most 140 characters"));
    }

    let service = MessageService::new(state.db.clone());
    let message = service
        .create_message(auth.id(), text)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.id(), "failed to create message");
            AppError::internal("failed to create message")
        })?;

    tracing::info!(user_id = %auth.id(), message_id = %message.id, "message created");
    Ok(Found::to(format!("/users/{}", auth.id())))
}

#[derive(Serialize)]
pub struct MessagePage {
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
}

pub async fn show_message(
    Path(id): Path<Uuid>,
    MaybeAuthUser(auth): MaybeAuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessagePage>, AppError> {
    let service = MessageService::new(state.db.clone());
    let message = service.get_message(id).await.map_err(|err| {
        tracing::error!(error = ?err, message_id = %id, "failed to fetch message");
        AppError::internal("failed to fetch message")
    })?;
    let message = message.ok_or_else(|| AppError::not_found("message not found"))?;

    let liked = match auth {
        Some(auth) => Some(
            EngagementService::new(state.db.clone())
                .has_liked(auth.id(), id)
                .await
                .map_err(|err| {
                    tracing::error!(error = ?err, message_id = %id, "failed to load like");
                    AppError::internal("failed to fetch message")
                })?,
        ),
        None => None,
    };

    Ok(Json(MessagePage { message, liked }))
}

pub async fn delete_message(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Found, AppError> {
    let service = MessageService::new(state.db.clone());
    let deleted = service.delete_message(id, auth.id()).await.map_err(|err| {
        tracing::error!(error = ?err, message_id = %id, "failed to delete message");
        AppError::internal("failed to delete message")
    })?;

    if deleted {
        tracing::info!(user_id = %auth.id(), message_id = %id, "message deleted");
        return Ok(Found::to(format!("/users/{}", auth.id())));
    }

    // Nothing deleted: either no such message or someone else's.
    let existing = service.get_message(id).await.map_err(|err| {
        tracing::error!(error = ?err, message_id = %id, "failed to fetch message");
        AppError::internal("failed to delete message")
    })?;
    match existing {
        Some(_) => Err(AppError::access_unauthorized()),
        None => Err(AppError::not_found("message not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let id = Uuid::new_v4();
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let encoded = encode_cursor(Some((at, id))).unwrap();
        assert_eq!(parse_cursor(Some(encoded)).unwrap(), Some((at, id)));
    }

    #[test]
    fn malformed_cursor_is_rejected() {
        assert!(parse_cursor(Some("nope".into())).is_err());
        assert!(parse_cursor(Some("2024-01-01T00:00:00Z/not-a-uuid".into())).is_err());
        assert_eq!(parse_cursor(None).unwrap(), None);
    }

    #[test]
    fn split_page_emits_cursor_only_when_more_remain() {
        let at = OffsetDateTime::UNIX_EPOCH;
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        let (items, next) = split_page(ids.clone(), 2, |id| (at, *id));
        assert_eq!(items, ids[..2].to_vec());
        assert_eq!(next, encode_cursor(Some((at, ids[1]))));

        let (items, next) = split_page(ids.clone(), 3, |id| (at, *id));
        assert_eq!(items.len(), 3);
        assert!(next.is_none());
    }

    #[test]
    fn limit_bounds() {
        assert_eq!(page_limit(None, 30).unwrap(), 30);
        assert!(page_limit(Some(0), 30).is_err());
        assert!(page_limit(Some(201), 30).is_err());
    }

    #[test]
    fn image_urls() {
        assert!(validate_image_url("image_url", "").is_ok());
        assert!(validate_image_url("image_url", "/static/images/default-pic.png").is_ok());
        assert!(validate_image_url("image_url", "https://example.com/a.png").is_ok());
        assert!(validate_image_url("image_url", "//evil.example/a.png").is_err());
        assert!(validate_image_url("image_url", "javascript:alert(1)").is_err());
        assert!(validate_image_url("image_url", "not a url").is_err());
    }

    #[test]
    fn account_fields() {
        assert!(validate_account_fields("user1", "user1@example.com").is_ok());
        assert!(validate_account_fields("", "user1@example.com").is_err());
        assert!(validate_account_fields("user1", "example.com").is_err());
        assert!(validate_account_fields(&"u".repeat(51), "a@b").is_err());
    }
}
