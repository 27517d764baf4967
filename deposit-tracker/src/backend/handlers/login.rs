use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use tracing::{info, warn};

use crate::backend::auth::verify_password;
use crate::backend::forms::LoginForm;
use crate::backend::session::{end_session, flash, start_session, take_flash, FlashKind};
use crate::backend::{views, AppError, AppState};

pub async fn form(jar: PrivateCookieJar) -> Response {
    let (jar, flash) = take_flash(jar);
    (jar, views::login(flash.as_ref(), None, "")).into_response()
}

pub async fn submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim();
    let user = state.store.get_user_by_username(username).await?;

    let authenticated = match &user {
        Some(user) => verify_password(form.password.clone(), user.password_hash.clone()).await?,
        None => false,
    };

    let Some(user) = user.filter(|_| authenticated) else {
        warn!(username, "failed login attempt");
        let page = views::login(None, Some("Invalid username or password"), username);
        return Ok((StatusCode::UNAUTHORIZED, page).into_response());
    };

    let jar = start_session(&state, jar, &user).await?;
    info!(user_id = user.id, username = %user.username, "user logged in");
    let jar = flash(jar, FlashKind::Success, format!("Welcome, {}", user.username));
    Ok((jar, Redirect::to("/")).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: PrivateCookieJar) -> Result<Response, AppError> {
    let jar = end_session(&state, jar).await?;
    let jar = flash(jar, FlashKind::Info, "You have been logged out");
    Ok((jar, Redirect::to("/login")).into_response())
}
