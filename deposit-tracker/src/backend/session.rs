//! Login state carried per request.
//!
//! The session cookie holds only a random token; the session itself lives in
//! the store. Handlers that need a logged-in user take a [`CurrentUser`] (or
//! [`AdminUser`]) argument instead of reading any shared state.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use chrono::{Duration, NaiveDateTime, Utc};

use crate::backend::{AppError, AppState};
use crate::database::models::{Session, User};

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});

        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(AppError::Unauthorized)?;

        let session = state
            .store
            .get_session(&token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if session.is_expired(Utc::now().naive_utc()) {
            state.store.delete_session(&token).await?;
            return Err(AppError::Unauthorized);
        }

        let user = state
            .store
            .get_user(session.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser { user, token })
    }
}

/// A logged-in user with the admin flag set.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        if !current.user.is_admin {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(current))
    }
}

/// When a session started at `now` should expire, or `None` if that is past
/// the end of the calendar.
fn session_expiry(now: NaiveDateTime, ttl_hours: i64) -> Option<NaiveDateTime> {
    Duration::try_hours(ttl_hours).and_then(|ttl| now.checked_add_signed(ttl))
}

pub async fn start_session(
    state: &AppState,
    jar: PrivateCookieJar,
    user: &User,
) -> Result<PrivateCookieJar, AppError> {
    let now = Utc::now().naive_utc();
    let expires_at = session_expiry(now, state.config.session_ttl_hours).ok_or_else(|| {
        AppError::Internal(format!(
            "session lifetime of {} hours is out of range",
            state.config.session_ttl_hours
        ))
    })?;
    let session = Session {
        token: uuid::Uuid::new_v4().to_string(),
        user_id: user.id,
        created_at: now,
        expires_at,
    };
    state.store.create_session(&session).await?;

    Ok(jar.add(
        Cookie::build((SESSION_COOKIE, session.token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    ))
}

pub async fn end_session(state: &AppState, jar: PrivateCookieJar) -> Result<PrivateCookieJar, AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.store.delete_session(cookie.value()).await?;
    }
    Ok(jar.remove(Cookie::build(SESSION_COOKIE).path("/")))
}

/* ========== Flash messages ========== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
            FlashKind::Info => "info",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(FlashKind::Success),
            "error" => Some(FlashKind::Error),
            "info" => Some(FlashKind::Info),
            _ => None,
        }
    }
}

/// One-shot message shown on the next page the browser renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

pub fn flash(jar: PrivateCookieJar, kind: FlashKind, message: impl Into<String>) -> PrivateCookieJar {
    let value = format!("{}:{}", kind.as_str(), message.into());
    jar.add(
        Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

pub fn take_flash(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };

    let flash = cookie.value().split_once(':').and_then(|(kind, message)| {
        Some(Flash {
            kind: FlashKind::parse(kind)?,
            message: message.to_string(),
        })
    });

    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}
