use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use tracing::info;

use super::ctx;
use crate::backend::forms::DepositForm;
use crate::backend::session::{flash, take_flash, CurrentUser, FlashKind};
use crate::backend::views::{self, FormMode};
use crate::backend::{AppError, AppState};
use crate::database::models::{Deposit, DepositPatch, DepositView, Summary};
use crate::database::StoreError;
use crate::util::today;

async fn find(state: &AppState, user_id: i64, id: i64) -> Result<Deposit, AppError> {
    Ok(state
        .store
        .get_deposit(user_id, id)
        .await?
        .ok_or_else(|| StoreError::not_found("deposit", id))?)
}

async fn list_views(state: &AppState, user_id: i64) -> Result<Vec<DepositView>, AppError> {
    let today = today();
    let views = state
        .store
        .list_deposits(user_id)
        .await?
        .into_iter()
        .map(|d| d.view(today))
        .collect::<Result<Vec<_>, _>>()
        .map_err(StoreError::from)?;
    Ok(views)
}

pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let settings = state.settings_for(current.id()).await?;
    let deposits = list_views(&state, current.id()).await?;
    Ok((jar, views::index(&ctx(&current, flash), &deposits, &settings)).into_response())
}

pub async fn detail(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let settings = state.settings_for(current.id()).await?;
    let view = find(&state, current.id(), id)
        .await?
        .view(today())
        .map_err(StoreError::from)?;
    Ok((jar, views::deposit_detail(&ctx(&current, flash), &view, &settings)).into_response())
}

pub async fn add_form(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let settings = state.settings_for(current.id()).await?;
    let banks = state.bank_choices(current.id()).await?;
    let form = DepositForm::blank(settings.default_tax_rate, today());
    let page = views::deposit_form(&ctx(&current, flash), FormMode::Add, &form, &banks, &[]);
    Ok((jar, page).into_response())
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Form(form): Form<DepositForm>,
) -> Result<Response, AppError> {
    let settings = state.settings_for(current.id()).await?;
    let banks = state.bank_choices(current.id()).await?;

    let new = match form.parse(settings.default_tax_rate, &banks) {
        Ok(new) => new,
        Err(errors) => {
            let page = views::deposit_form(&ctx(&current, None), FormMode::Add, &form, &banks, &errors);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let deposit = state.store.create_deposit(current.id(), &new).await?;
    info!(user_id = current.id(), deposit = %deposit.reference(), "deposit created");

    let jar = flash(jar, FlashKind::Success, format!("Deposit {} added", deposit.reference()));
    Ok((jar, Redirect::to(&format!("/deposits/{}", deposit.id))).into_response())
}

pub async fn edit_form(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let deposit = find(&state, current.id(), id).await?;
    let banks = state.bank_choices(current.id()).await?;
    let form = DepositForm::from_deposit(&deposit);
    let page = views::deposit_form(&ctx(&current, flash), FormMode::Edit(id), &form, &banks, &[]);
    Ok((jar, page).into_response())
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
    Form(form): Form<DepositForm>,
) -> Result<Response, AppError> {
    find(&state, current.id(), id).await?;
    let settings = state.settings_for(current.id()).await?;
    let banks = state.bank_choices(current.id()).await?;

    let new = match form.parse(settings.default_tax_rate, &banks) {
        Ok(new) => new,
        Err(errors) => {
            let page = views::deposit_form(&ctx(&current, None), FormMode::Edit(id), &form, &banks, &errors);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let deposit = state
        .store
        .update_deposit(current.id(), id, DepositPatch::from(new))
        .await?;
    info!(user_id = current.id(), deposit = %deposit.reference(), "deposit updated");

    let jar = flash(jar, FlashKind::Success, format!("Deposit {} updated", deposit.reference()));
    Ok((jar, Redirect::to(&format!("/deposits/{}", deposit.id))).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    state.store.delete_deposit(current.id(), id).await?;
    info!(user_id = current.id(), deposit_id = id, "deposit deleted");

    let jar = flash(jar, FlashKind::Success, format!("Deposit DEP{:03} deleted", id));
    Ok((jar, Redirect::to("/")).into_response())
}

pub async fn summary(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let settings = state.settings_for(current.id()).await?;
    let deposits = list_views(&state, current.id()).await?;
    let summary = Summary::from_views(&deposits).map_err(StoreError::from)?;
    Ok((jar, views::summary(&ctx(&current, flash), &summary, &settings)).into_response())
}

/// Every deposit of the caller with its derived figures.
pub async fn api_list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<DepositView>>, AppError> {
    Ok(Json(list_views(&state, current.id()).await?))
}
