use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use tracing::info;

use super::ctx;
use crate::backend::auth::hash_password;
use crate::backend::forms::{NewUserForm, PasswordForm};
use crate::backend::session::{flash, take_flash, AdminUser, FlashKind};
use crate::backend::{views, AppError, AppState};
use crate::database::models::NewUser;
use crate::database::StoreError;

fn back(jar: PrivateCookieJar, kind: FlashKind, message: impl Into<String>) -> Response {
    (flash(jar, kind, message), Redirect::to("/admin/users")).into_response()
}

pub async fn users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let users = state.store.list_users().await?;
    Ok((jar, views::admin_users(&ctx(&admin, flash), &users)).into_response())
}

pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    jar: PrivateCookieJar,
    Form(form): Form<NewUserForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Ok(back(jar, FlashKind::Error, "Username and password are required"));
    }

    let password_hash = hash_password(form.password.clone(), state.config.bcrypt_cost).await?;
    let new = NewUser {
        username: username.to_string(),
        password_hash,
        is_admin: form.is_admin.is_some(),
    };

    match state.store.create_user(&new).await {
        Ok(user) => {
            info!(admin = %admin.user.username, username = %user.username, is_admin = user.is_admin, "user created");
            Ok(back(jar, FlashKind::Success, format!("User {} created", user.username)))
        }
        Err(StoreError::Conflict(message)) => Ok(back(jar, FlashKind::Error, message)),
        Err(e) => Err(e.into()),
    }
}

pub async fn reset_password(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
    Form(form): Form<PasswordForm>,
) -> Result<Response, AppError> {
    if form.new_password.is_empty() {
        return Err(AppError::BadRequest("new password is required".to_string()));
    }

    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| StoreError::not_found("user", id))?;
    let password_hash = hash_password(form.new_password, state.config.bcrypt_cost).await?;
    state.store.update_user_password(id, &password_hash).await?;
    info!(admin = %admin.user.username, username = %user.username, "password reset");

    Ok(back(jar, FlashKind::Success, format!("Password of {} updated", user.username)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if id == admin.id() {
        return Ok(back(jar, FlashKind::Error, "You cannot delete your own account"));
    }

    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| StoreError::not_found("user", id))?;
    state.store.delete_user(id).await?;
    info!(admin = %admin.user.username, username = %user.username, "user deleted");

    Ok(back(jar, FlashKind::Success, format!("User {} deleted", user.username)))
}
