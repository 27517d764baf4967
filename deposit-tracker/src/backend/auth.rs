use anyhow::Context;
use tracing::{info, warn};

use crate::backend::AppError;
use crate::config::Config;
use crate::database::models::NewUser;
use crate::database::Store;

// bcrypt blocks for a noticeable time; both helpers run it on the blocking pool

pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Creates the configured admin account when the store has no users at all.
pub async fn ensure_admin(store: &dyn Store, config: &Config) -> anyhow::Result<()> {
    if store.count_users().await? > 0 {
        return Ok(());
    }

    let password_hash = hash_password(config.admin_password.clone(), config.bcrypt_cost)
        .await
        .context("hashing the initial admin password")?;
    let admin = store
        .create_user(&NewUser {
            username: config.admin_username.clone(),
            password_hash,
            is_admin: true,
        })
        .await?;

    info!(username = %admin.username, "created initial admin user");
    if config.admin_password == "admin123" {
        warn!("initial admin uses the default password; change it from the admin page");
    }
    Ok(())
}
