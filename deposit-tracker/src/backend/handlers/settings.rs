use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use tracing::info;

use super::ctx;
use crate::backend::forms::SettingsForm;
use crate::backend::session::{flash, take_flash, CurrentUser, FlashKind};
use crate::backend::{views, AppError, AppState};
use crate::database::models::settings::{CURRENCY_SYMBOL_KEY, DEFAULT_TAX_RATE_KEY};

pub async fn form(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let settings = state.settings_for(current.id()).await?;
    let form = SettingsForm {
        default_tax_rate: settings.default_tax_rate.normalize().to_string(),
        currency_symbol: settings.currency_symbol,
    };
    Ok((jar, views::settings(&ctx(&current, flash), &form, &[])).into_response())
}

pub async fn save(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
    Form(form): Form<SettingsForm>,
) -> Result<Response, AppError> {
    let update = match form.parse() {
        Ok(update) => update,
        Err(errors) => {
            let page = views::settings(&ctx(&current, None), &form, &errors);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let rate = update.default_tax_rate.normalize().to_string();
    state.store.set_setting(current.id(), DEFAULT_TAX_RATE_KEY, &rate).await?;
    if let Some(symbol) = &update.currency_symbol {
        state.store.set_setting(current.id(), CURRENCY_SYMBOL_KEY, symbol).await?;
    }
    info!(user_id = current.id(), default_tax_rate = %rate, "settings saved");

    let jar = flash(jar, FlashKind::Success, "Settings saved");
    Ok((jar, Redirect::to("/settings")).into_response())
}
