use axum::{
    routing::{get, post},
    Router,
};
use crate::backend::{handlers, AppState};

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(handlers::login::form).post(handlers::login::submit))
        .route("/logout", get(handlers::login::logout).post(handlers::login::logout))
        .route("/", get(handlers::deposits::index))
        .route("/deposits/add", get(handlers::deposits::add_form).post(handlers::deposits::create))
        .route("/deposits/:id", get(handlers::deposits::detail))
        .route("/deposits/:id/edit", get(handlers::deposits::edit_form).post(handlers::deposits::update))
        .route("/deposits/:id/delete", post(handlers::deposits::delete))
        .route("/summary", get(handlers::deposits::summary))
        .route("/banks", get(handlers::banks::index))
        .route("/banks/add", post(handlers::banks::create))
        .route("/banks/:id/edit", get(handlers::banks::edit_form).post(handlers::banks::update))
        .route("/banks/:id/delete", post(handlers::banks::delete))
        .route("/settings", get(handlers::settings::form).post(handlers::settings::save))
        .route("/admin/users", get(handlers::admin::users))
        .route("/admin/users/add", post(handlers::admin::create_user))
        .route("/admin/users/:id/password", post(handlers::admin::reset_password))
        .route("/admin/users/:id/delete", post(handlers::admin::delete_user))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/deposits", get(handlers::deposits::api_list))
}
