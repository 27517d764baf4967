pub mod admin;
pub mod banks;
pub mod deposits;
pub mod login;
pub mod settings;

use crate::backend::session::{CurrentUser, Flash};
use crate::backend::views::Ctx;
use crate::backend::AppError;

fn ctx(current: &CurrentUser, flash: Option<Flash>) -> Ctx<'_> {
    Ctx {
        user: &current.user,
        flash,
    }
}

pub async fn not_found() -> AppError {
    AppError::NotFound("page".to_string())
}
