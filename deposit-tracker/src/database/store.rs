use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::calculation::CalcError;
use crate::database::models::{
    Bank, BankPatch, Deposit, DepositPatch, NewBank, NewDeposit, NewUser, Session, User,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Calc(#[from] CalcError),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound { entity, id: id.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence for every record the application keeps.
///
/// Deposits and banks are always scoped to their owning user: asking for
/// another user's record behaves exactly like asking for a missing one.
/// Backends implement the primitive operations; `create_*` and `update_*`
/// validate before delegating to them so both backends share one set of
/// rules.
#[async_trait]
pub trait Store: Send + Sync {
    /* ========== Deposits ========== */

    async fn insert_deposit(&self, user_id: i64, new: &NewDeposit) -> Result<Deposit>;
    async fn get_deposit(&self, user_id: i64, id: i64) -> Result<Option<Deposit>>;
    async fn list_deposits(&self, user_id: i64) -> Result<Vec<Deposit>>;
    /// Overwrites every user-supplied field. `NotFound` if absent.
    async fn replace_deposit(&self, user_id: i64, id: i64, new: &NewDeposit) -> Result<Deposit>;
    /// `NotFound` if absent.
    async fn delete_deposit(&self, user_id: i64, id: i64) -> Result<()>;

    async fn create_deposit(&self, user_id: i64, new: &NewDeposit) -> Result<Deposit> {
        validate_deposit(new)?;
        self.insert_deposit(user_id, new).await
    }

    async fn update_deposit(&self, user_id: i64, id: i64, patch: DepositPatch) -> Result<Deposit> {
        let current = self
            .get_deposit(user_id, id)
            .await?
            .ok_or_else(|| StoreError::not_found("deposit", id))?;
        let next = patch.apply(current.to_new());
        validate_deposit(&next)?;
        self.replace_deposit(user_id, id, &next).await
    }

    /* ========== Banks ========== */

    /// `Conflict` if the user already has a bank with this name.
    async fn insert_bank(&self, user_id: i64, new: &NewBank) -> Result<Bank>;
    async fn get_bank(&self, user_id: i64, id: i64) -> Result<Option<Bank>>;
    /// Ordered by name.
    async fn list_banks(&self, user_id: i64) -> Result<Vec<Bank>>;
    async fn replace_bank(&self, user_id: i64, id: i64, new: &NewBank) -> Result<Bank>;
    /// Deposits naming the bank are left alone.
    async fn delete_bank(&self, user_id: i64, id: i64) -> Result<()>;

    async fn create_bank(&self, user_id: i64, new: &NewBank) -> Result<Bank> {
        validate_bank(new)?;
        self.insert_bank(user_id, new).await
    }

    async fn update_bank(&self, user_id: i64, id: i64, patch: BankPatch) -> Result<Bank> {
        let current = self
            .get_bank(user_id, id)
            .await?
            .ok_or_else(|| StoreError::not_found("bank", id))?;
        let next = NewBank {
            name: patch.name.unwrap_or(current.name),
            default_interest_rate: patch
                .default_interest_rate
                .unwrap_or(current.default_interest_rate),
        };
        validate_bank(&next)?;
        self.replace_bank(user_id, id, &next).await
    }

    async fn find_bank_by_name(&self, user_id: i64, name: &str) -> Result<Option<Bank>> {
        Ok(self
            .list_banks(user_id)
            .await?
            .into_iter()
            .find(|b| b.name == name))
    }

    /* ========== Users ========== */

    /// `Conflict` if the username is taken.
    async fn create_user(&self, new: &NewUser) -> Result<User>;
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    /// Ordered by username.
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn count_users(&self) -> Result<i64>;
    async fn update_user_password(&self, id: i64, password_hash: &str) -> Result<()>;
    /// Removes the user's deposits, banks, settings and sessions as well.
    async fn delete_user(&self, id: i64) -> Result<()>;

    /* ========== Sessions ========== */

    async fn create_session(&self, session: &Session) -> Result<()>;
    async fn get_session(&self, token: &str) -> Result<Option<Session>>;
    /// No-op if the token is unknown.
    async fn delete_session(&self, token: &str) -> Result<()>;

    /* ========== Settings ========== */

    async fn get_setting(&self, user_id: i64, key: &str) -> Result<Option<String>>;
    async fn set_setting(&self, user_id: i64, key: &str, value: &str) -> Result<()>;
}

fn validate_deposit(new: &NewDeposit) -> Result<()> {
    for (field, value) in [
        ("account holder", &new.account_holder),
        ("account number", &new.account_number),
        ("bank", &new.bank_name),
    ] {
        if value.trim().is_empty() {
            return Err(StoreError::Invalid(format!("{} is required", field)));
        }
    }
    new.validate()?;
    Ok(())
}

fn validate_bank(new: &NewBank) -> Result<()> {
    if new.name.trim().is_empty() {
        return Err(StoreError::Invalid("bank name is required".to_string()));
    }
    if new.default_interest_rate < Decimal::ZERO {
        return Err(StoreError::Invalid(format!(
            "default interest rate cannot be negative (got {})",
            new.default_interest_rate
        )));
    }
    Ok(())
}
