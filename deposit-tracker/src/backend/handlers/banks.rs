use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use tracing::info;

use super::ctx;
use crate::backend::forms::BankForm;
use crate::backend::session::{flash, take_flash, CurrentUser, FlashKind};
use crate::backend::{views, AppError, AppState};
use crate::database::models::BankPatch;
use crate::database::StoreError;

pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let banks = state.store.list_banks(current.id()).await?;
    let page = views::banks(&ctx(&current, flash), &banks, &BankForm::default(), &[]);
    Ok((jar, page).into_response())
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Form(form): Form<BankForm>,
) -> Result<Response, AppError> {
    let new = match form.parse() {
        Ok(new) => new,
        Err(errors) => {
            return rejected(&state, &current, &form, StatusCode::UNPROCESSABLE_ENTITY, errors).await
        }
    };

    match state.store.create_bank(current.id(), &new).await {
        Ok(bank) => {
            info!(user_id = current.id(), bank = %bank.name, "bank created");
            let jar = flash(jar, FlashKind::Success, format!("Bank {} added", bank.name));
            Ok((jar, Redirect::to("/banks")).into_response())
        }
        Err(StoreError::Conflict(message)) => {
            rejected(&state, &current, &form, StatusCode::CONFLICT, vec![message]).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn rejected(
    state: &AppState,
    current: &CurrentUser,
    form: &BankForm,
    status: StatusCode,
    errors: Vec<String>,
) -> Result<Response, AppError> {
    let banks = state.store.list_banks(current.id()).await?;
    let page = views::banks(&ctx(current, None), &banks, form, &errors);
    Ok((status, page).into_response())
}

pub async fn edit_form(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let bank = state
        .store
        .get_bank(current.id(), id)
        .await?
        .ok_or_else(|| StoreError::not_found("bank", id))?;
    let page = views::bank_form(&ctx(&current, flash), id, &BankForm::from_bank(&bank), &[]);
    Ok((jar, page).into_response())
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
    Form(form): Form<BankForm>,
) -> Result<Response, AppError> {
    if state.store.get_bank(current.id(), id).await?.is_none() {
        return Err(StoreError::not_found("bank", id).into());
    }

    let (status, errors) = match form.parse() {
        Ok(new) => {
            let patch = BankPatch {
                name: Some(new.name),
                default_interest_rate: Some(new.default_interest_rate),
            };
            match state.store.update_bank(current.id(), id, patch).await {
                Ok(bank) => {
                    info!(user_id = current.id(), bank = %bank.name, "bank updated");
                    let jar = flash(jar, FlashKind::Success, format!("Bank {} updated", bank.name));
                    return Ok((jar, Redirect::to("/banks")).into_response());
                }
                Err(StoreError::Conflict(message)) => (StatusCode::CONFLICT, vec![message]),
                Err(e) => return Err(e.into()),
            }
        }
        Err(errors) => (StatusCode::UNPROCESSABLE_ENTITY, errors),
    };

    let page = views::bank_form(&ctx(&current, None), id, &form, &errors);
    Ok((status, page).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let bank = state
        .store
        .get_bank(current.id(), id)
        .await?
        .ok_or_else(|| StoreError::not_found("bank", id))?;
    state.store.delete_bank(current.id(), id).await?;
    info!(user_id = current.id(), bank = %bank.name, "bank deleted");

    let jar = flash(jar, FlashKind::Success, format!("Bank {} deleted", bank.name));
    Ok((jar, Redirect::to("/banks")).into_response())
}
