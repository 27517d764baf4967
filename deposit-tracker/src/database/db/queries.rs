use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

use crate::database::db::{connection, migrate};
use crate::database::models::{Bank, Deposit, NewBank, NewDeposit, NewUser, Session, User};
use crate::database::store::{Result, Store, StoreError};

/*
SQLite implementation of the store: the SQL for every CRUD operation and the
mapping between rows and model structs. Decimals are stored as TEXT and
parsed back with Decimal::from_str.
 */

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Connects and brings the schema up to date.
    pub async fn open(db_url: &str) -> Result<Self> {
        let pool = connection::get_db_pool(db_url).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

fn decimal_column(row: &SqliteRow, column: &str) -> std::result::Result<Decimal, sqlx::Error> {
    let text: String = row.try_get(column)?;
    Decimal::from_str(&text).map_err(|e| {
        sqlx::Error::Decode(format!("Invalid Decimal format for {}: {}", column, e).into())
    })
}

fn deposit_from_row(row: &SqliteRow) -> std::result::Result<Deposit, sqlx::Error> {
    Ok(Deposit {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        account_holder: row.try_get("account_holder")?,
        account_number: row.try_get("account_number")?,
        bank_name: row.try_get("bank_name")?,
        principal_amount: decimal_column(row, "principal_amount")?,
        interest_rate: decimal_column(row, "interest_rate")?,
        tax_rate: decimal_column(row, "tax_rate")?,
        deposit_date: row.try_get("deposit_date")?,
        maturity_date: row.try_get("maturity_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn bank_from_row(row: &SqliteRow) -> std::result::Result<Bank, sqlx::Error> {
    Ok(Bank {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        default_interest_rate: decimal_column(row, "default_interest_rate")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn user_from_row(row: &SqliteRow) -> std::result::Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn session_from_row(row: &SqliteRow) -> std::result::Result<Session, sqlx::Error> {
    Ok(Session {
        token: row.try_get("token")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

/// Turns a UNIQUE violation into `Conflict`, leaving other errors alone.
fn conflict_on_unique(e: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(message()),
        _ => StoreError::Sqlx(e),
    }
}

const DEPOSIT_COLUMNS: &str = r#"
    id, user_id, account_holder, account_number, bank_name,
    principal_amount, interest_rate, tax_rate, deposit_date, maturity_date,
    created_at, updated_at
"#;

const BANK_COLUMNS: &str = "id, user_id, name, default_interest_rate, created_at, updated_at";

const USER_COLUMNS: &str = "id, username, password_hash, is_admin, created_at, updated_at";

#[async_trait]
impl Store for SqliteStore {
    /*==========Deposit Queries=========== */

    async fn insert_deposit(&self, user_id: i64, new: &NewDeposit) -> Result<Deposit> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO deposits (
                user_id, account_holder, account_number, bank_name,
                principal_amount, interest_rate, tax_rate, deposit_date, maturity_date,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            DEPOSIT_COLUMNS
        ))
        .bind(user_id)
        .bind(&new.account_holder)
        .bind(&new.account_number)
        .bind(&new.bank_name)
        .bind(new.principal_amount.to_string())
        .bind(new.interest_rate.to_string())
        .bind(new.tax_rate.to_string())
        .bind(new.deposit_date)
        .bind(new.maturity_date)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(deposit_from_row(&row)?)
    }

    async fn get_deposit(&self, user_id: i64, id: i64) -> Result<Option<Deposit>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM deposits WHERE id = ? AND user_id = ?",
            DEPOSIT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(deposit_from_row).transpose()?)
    }

    async fn list_deposits(&self, user_id: i64) -> Result<Vec<Deposit>> {
        let deposits = sqlx::query(&format!(
            "SELECT {} FROM deposits WHERE user_id = ? ORDER BY id ASC",
            DEPOSIT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(deposit_from_row)
        .collect::<std::result::Result<Vec<Deposit>, sqlx::Error>>()?;

        Ok(deposits)
    }

    async fn replace_deposit(&self, user_id: i64, id: i64, new: &NewDeposit) -> Result<Deposit> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE deposits
            SET account_holder = ?, account_number = ?, bank_name = ?,
                principal_amount = ?, interest_rate = ?, tax_rate = ?,
                deposit_date = ?, maturity_date = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING {}
            "#,
            DEPOSIT_COLUMNS
        ))
        .bind(&new.account_holder)
        .bind(&new.account_number)
        .bind(&new.bank_name)
        .bind(new.principal_amount.to_string())
        .bind(new.interest_rate.to_string())
        .bind(new.tax_rate.to_string())
        .bind(new.deposit_date)
        .bind(new.maturity_date)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("deposit", id))?;

        Ok(deposit_from_row(&row)?)
    }

    async fn delete_deposit(&self, user_id: i64, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM deposits WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("deposit", id));
        }
        Ok(())
    }

    /*==========Bank Queries=========== */

    async fn insert_bank(&self, user_id: i64, new: &NewBank) -> Result<Bank> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO banks (user_id, name, default_interest_rate, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            BANK_COLUMNS
        ))
        .bind(user_id)
        .bind(&new.name)
        .bind(new.default_interest_rate.to_string())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("bank {} already exists", new.name)))?;

        Ok(bank_from_row(&row)?)
    }

    async fn get_bank(&self, user_id: i64, id: i64) -> Result<Option<Bank>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM banks WHERE id = ? AND user_id = ?",
            BANK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(bank_from_row).transpose()?)
    }

    async fn list_banks(&self, user_id: i64) -> Result<Vec<Bank>> {
        let banks = sqlx::query(&format!(
            "SELECT {} FROM banks WHERE user_id = ? ORDER BY name ASC",
            BANK_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(bank_from_row)
        .collect::<std::result::Result<Vec<Bank>, sqlx::Error>>()?;

        Ok(banks)
    }

    async fn replace_bank(&self, user_id: i64, id: i64, new: &NewBank) -> Result<Bank> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE banks
            SET name = ?, default_interest_rate = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING {}
            "#,
            BANK_COLUMNS
        ))
        .bind(&new.name)
        .bind(new.default_interest_rate.to_string())
        .bind(Utc::now().naive_utc())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("bank {} already exists", new.name)))?
        .ok_or_else(|| StoreError::not_found("bank", id))?;

        Ok(bank_from_row(&row)?)
    }

    async fn delete_bank(&self, user_id: i64, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM banks WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("bank", id));
        }
        Ok(())
    }

    /*==========User Queries=========== */

    async fn create_user(&self, new: &NewUser) -> Result<User> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (username, password_hash, is_admin, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(new.is_admin)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("username {} already exists", new.username)))?;

        Ok(user_from_row(&row)?)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query(&format!("SELECT {} FROM users ORDER BY username ASC", USER_COLUMNS))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(user_from_row)
            .collect::<std::result::Result<Vec<User>, sqlx::Error>>()?;

        Ok(users)
    }

    async fn count_users(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_user_password(&self, id: i64, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now().naive_utc())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", id));
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        // foreign keys cascade to deposits, banks, sessions and settings
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", id));
        }
        Ok(())
    }

    /*==========Session Queries=========== */

    async fn create_session(&self, session: &Session) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // also drops expired sessions whose cookie is never presented again
        sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().naive_utc())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(session_from_row).transpose()?)
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /*==========Setting Queries=========== */

    async fn get_setting(&self, user_id: i64, key: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM user_settings WHERE user_id = ? AND key = ?")
                .bind(user_id)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn set_setting(&self, user_id: i64, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_settings (user_id, key, value, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id, key) DO UPDATE
            SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(key)
        .bind(value)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
