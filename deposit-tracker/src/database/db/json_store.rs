//! Flat-file store: one pretty-printed JSON array per collection.
//!
//! Everything is loaded at open and kept in memory behind a mutex. A mutation
//! works on copies of the collections it touches and stages their new
//! contents. Every staged file is written to a temp file first and only when
//! all of them are on disk are they renamed into place and the copies swapped
//! into memory. A failed write leaves both the files and memory as they were.
//!
//! Ids come from `counters.json`, a high-water mark per collection, so an id
//! is never handed out twice even after the newest record is deleted.

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::warn;

use crate::database::models::{
    Bank, Deposit, NewBank, NewDeposit, NewUser, Session, SettingRecord, User,
};
use crate::database::store::{Result, Store, StoreError};

const DEPOSITS_FILE: &str = "deposits.json";
const BANKS_FILE: &str = "banks.json";
const USERS_FILE: &str = "users.json";
const SESSIONS_FILE: &str = "sessions.json";
const SETTINGS_FILE: &str = "settings.json";
const COUNTERS_FILE: &str = "counters.json";

/// Last id handed out per collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct Counters {
    deposits: i64,
    banks: i64,
    users: i64,
}

impl Counters {
    /// Never below an id already on disk, e.g. for a data directory written
    /// before the counters file existed.
    fn raised_to(self, data: &Collections) -> Self {
        Counters {
            deposits: self.deposits.max(max_id(data.deposits.iter().map(|d| d.id))),
            banks: self.banks.max(max_id(data.banks.iter().map(|b| b.id))),
            users: self.users.max(max_id(data.users.iter().map(|u| u.id))),
        }
    }
}

fn max_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0)
}

#[derive(Default)]
struct Collections {
    deposits: Vec<Deposit>,
    banks: Vec<Bank>,
    users: Vec<User>,
    sessions: Vec<Session>,
    settings: Vec<SettingRecord>,
    counters: Counters,
}

/// Serialized file contents waiting to be committed together.
#[derive(Default)]
struct Staged {
    files: Vec<(&'static str, Vec<u8>)>,
}

impl Staged {
    fn put<T: Serialize + ?Sized>(mut self, file: &'static str, value: &T) -> Result<Self> {
        self.files.push((file, serde_json::to_vec_pretty(value)?));
        Ok(self)
    }
}

pub struct JsonStore {
    dir: PathBuf,
    data: Mutex<Collections>,
}

impl JsonStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let mut data = Collections {
            deposits: load(&dir, DEPOSITS_FILE).await?,
            banks: load(&dir, BANKS_FILE).await?,
            users: load(&dir, USERS_FILE).await?,
            sessions: load(&dir, SESSIONS_FILE).await?,
            settings: load(&dir, SETTINGS_FILE).await?,
            counters: Counters::default(),
        };
        let stored: Counters = load(&dir, COUNTERS_FILE).await?;
        data.counters = stored.raised_to(&data);

        Ok(Self { dir, data: Mutex::new(data) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn tmp_path(&self, file: &str) -> PathBuf {
        self.dir.join(format!("{}.tmp", file))
    }

    /// Writes every staged file or none of them.
    async fn commit(&self, staged: Staged) -> Result<()> {
        for (i, (file, bytes)) in staged.files.iter().enumerate() {
            if let Err(e) = tokio::fs::write(self.tmp_path(file), bytes).await {
                for (written, _) in &staged.files[..i] {
                    if let Err(cleanup) = tokio::fs::remove_file(self.tmp_path(written)).await {
                        warn!(file = %written, error = %cleanup, "could not remove temp file");
                    }
                }
                return Err(e.into());
            }
        }
        for (file, _) in &staged.files {
            tokio::fs::rename(self.tmp_path(file), self.dir.join(file)).await?;
        }
        Ok(())
    }
}

async fn load<T: DeserializeOwned + Default>(dir: &Path, file: &str) -> Result<T> {
    match tokio::fs::read(dir.join(file)).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(T::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

fn bank_name_taken(banks: &[Bank], user_id: i64, name: &str, except: Option<i64>) -> bool {
    banks
        .iter()
        .any(|b| b.user_id == user_id && b.name == name && Some(b.id) != except)
}

#[async_trait]
impl Store for JsonStore {
    /* ========== Deposits ========== */

    async fn insert_deposit(&self, user_id: i64, new: &NewDeposit) -> Result<Deposit> {
        let mut data = self.data.lock().await;
        let now = Utc::now().naive_utc();
        let counters = Counters { deposits: data.counters.deposits + 1, ..data.counters };
        let deposit = Deposit {
            id: counters.deposits,
            user_id,
            account_holder: new.account_holder.clone(),
            account_number: new.account_number.clone(),
            bank_name: new.bank_name.clone(),
            principal_amount: new.principal_amount,
            interest_rate: new.interest_rate,
            tax_rate: new.tax_rate,
            deposit_date: new.deposit_date,
            maturity_date: new.maturity_date,
            created_at: now,
            updated_at: now,
        };
        let mut deposits = data.deposits.clone();
        deposits.push(deposit.clone());

        let staged = Staged::default()
            .put(COUNTERS_FILE, &counters)?
            .put(DEPOSITS_FILE, &deposits)?;
        self.commit(staged).await?;
        data.counters = counters;
        data.deposits = deposits;
        Ok(deposit)
    }

    async fn get_deposit(&self, user_id: i64, id: i64) -> Result<Option<Deposit>> {
        let data = self.data.lock().await;
        Ok(data
            .deposits
            .iter()
            .find(|d| d.id == id && d.user_id == user_id)
            .cloned())
    }

    async fn list_deposits(&self, user_id: i64) -> Result<Vec<Deposit>> {
        let data = self.data.lock().await;
        let mut deposits: Vec<Deposit> = data
            .deposits
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        deposits.sort_by_key(|d| d.id);
        Ok(deposits)
    }

    async fn replace_deposit(&self, user_id: i64, id: i64, new: &NewDeposit) -> Result<Deposit> {
        let mut data = self.data.lock().await;
        let mut deposits = data.deposits.clone();
        let deposit = deposits
            .iter_mut()
            .find(|d| d.id == id && d.user_id == user_id)
            .ok_or_else(|| StoreError::not_found("deposit", id))?;

        deposit.account_holder = new.account_holder.clone();
        deposit.account_number = new.account_number.clone();
        deposit.bank_name = new.bank_name.clone();
        deposit.principal_amount = new.principal_amount;
        deposit.interest_rate = new.interest_rate;
        deposit.tax_rate = new.tax_rate;
        deposit.deposit_date = new.deposit_date;
        deposit.maturity_date = new.maturity_date;
        deposit.updated_at = Utc::now().naive_utc();
        let updated = deposit.clone();

        self.commit(Staged::default().put(DEPOSITS_FILE, &deposits)?).await?;
        data.deposits = deposits;
        Ok(updated)
    }

    async fn delete_deposit(&self, user_id: i64, id: i64) -> Result<()> {
        let mut data = self.data.lock().await;
        let mut deposits = data.deposits.clone();
        deposits.retain(|d| !(d.id == id && d.user_id == user_id));
        if deposits.len() == data.deposits.len() {
            return Err(StoreError::not_found("deposit", id));
        }
        self.commit(Staged::default().put(DEPOSITS_FILE, &deposits)?).await?;
        data.deposits = deposits;
        Ok(())
    }

    /* ========== Banks ========== */

    async fn insert_bank(&self, user_id: i64, new: &NewBank) -> Result<Bank> {
        let mut data = self.data.lock().await;
        if bank_name_taken(&data.banks, user_id, &new.name, None) {
            return Err(StoreError::Conflict(format!("bank {} already exists", new.name)));
        }

        let now = Utc::now().naive_utc();
        let counters = Counters { banks: data.counters.banks + 1, ..data.counters };
        let bank = Bank {
            id: counters.banks,
            user_id,
            name: new.name.clone(),
            default_interest_rate: new.default_interest_rate,
            created_at: now,
            updated_at: now,
        };
        let mut banks = data.banks.clone();
        banks.push(bank.clone());

        let staged = Staged::default()
            .put(COUNTERS_FILE, &counters)?
            .put(BANKS_FILE, &banks)?;
        self.commit(staged).await?;
        data.counters = counters;
        data.banks = banks;
        Ok(bank)
    }

    async fn get_bank(&self, user_id: i64, id: i64) -> Result<Option<Bank>> {
        let data = self.data.lock().await;
        Ok(data
            .banks
            .iter()
            .find(|b| b.id == id && b.user_id == user_id)
            .cloned())
    }

    async fn list_banks(&self, user_id: i64) -> Result<Vec<Bank>> {
        let data = self.data.lock().await;
        let mut banks: Vec<Bank> = data
            .banks
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        banks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(banks)
    }

    async fn replace_bank(&self, user_id: i64, id: i64, new: &NewBank) -> Result<Bank> {
        let mut data = self.data.lock().await;
        if bank_name_taken(&data.banks, user_id, &new.name, Some(id)) {
            return Err(StoreError::Conflict(format!("bank {} already exists", new.name)));
        }

        let mut banks = data.banks.clone();
        let bank = banks
            .iter_mut()
            .find(|b| b.id == id && b.user_id == user_id)
            .ok_or_else(|| StoreError::not_found("bank", id))?;
        bank.name = new.name.clone();
        bank.default_interest_rate = new.default_interest_rate;
        bank.updated_at = Utc::now().naive_utc();
        let updated = bank.clone();

        self.commit(Staged::default().put(BANKS_FILE, &banks)?).await?;
        data.banks = banks;
        Ok(updated)
    }

    async fn delete_bank(&self, user_id: i64, id: i64) -> Result<()> {
        let mut data = self.data.lock().await;
        let mut banks = data.banks.clone();
        banks.retain(|b| !(b.id == id && b.user_id == user_id));
        if banks.len() == data.banks.len() {
            return Err(StoreError::not_found("bank", id));
        }
        self.commit(Staged::default().put(BANKS_FILE, &banks)?).await?;
        data.banks = banks;
        Ok(())
    }

    /* ========== Users ========== */

    async fn create_user(&self, new: &NewUser) -> Result<User> {
        let mut data = self.data.lock().await;
        if data.users.iter().any(|u| u.username == new.username) {
            return Err(StoreError::Conflict(format!(
                "username {} already exists",
                new.username
            )));
        }

        let now = Utc::now().naive_utc();
        let counters = Counters { users: data.counters.users + 1, ..data.counters };
        let user = User {
            id: counters.users,
            username: new.username.clone(),
            password_hash: new.password_hash.clone(),
            is_admin: new.is_admin,
            created_at: now,
            updated_at: now,
        };
        let mut users = data.users.clone();
        users.push(user.clone());

        let staged = Staged::default()
            .put(COUNTERS_FILE, &counters)?
            .put(USERS_FILE, &users)?;
        self.commit(staged).await?;
        data.counters = counters;
        data.users = users;
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let data = self.data.lock().await;
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let data = self.data.lock().await;
        Ok(data.users.iter().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let data = self.data.lock().await;
        let mut users = data.users.clone();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn count_users(&self) -> Result<i64> {
        let data = self.data.lock().await;
        Ok(data.users.len() as i64)
    }

    async fn update_user_password(&self, id: i64, password_hash: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        let mut users = data.users.clone();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now().naive_utc();

        self.commit(Staged::default().put(USERS_FILE, &users)?).await?;
        data.users = users;
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        let mut data = self.data.lock().await;
        if !data.users.iter().any(|u| u.id == id) {
            return Err(StoreError::not_found("user", id));
        }

        let users: Vec<User> = data.users.iter().filter(|u| u.id != id).cloned().collect();
        let deposits: Vec<Deposit> = data.deposits.iter().filter(|d| d.user_id != id).cloned().collect();
        let banks: Vec<Bank> = data.banks.iter().filter(|b| b.user_id != id).cloned().collect();
        let sessions: Vec<Session> = data.sessions.iter().filter(|s| s.user_id != id).cloned().collect();
        let settings: Vec<SettingRecord> =
            data.settings.iter().filter(|s| s.user_id != id).cloned().collect();

        let staged = Staged::default()
            .put(USERS_FILE, &users)?
            .put(DEPOSITS_FILE, &deposits)?
            .put(BANKS_FILE, &banks)?
            .put(SESSIONS_FILE, &sessions)?
            .put(SETTINGS_FILE, &settings)?;
        self.commit(staged).await?;

        data.users = users;
        data.deposits = deposits;
        data.banks = banks;
        data.sessions = sessions;
        data.settings = settings;
        Ok(())
    }

    /* ========== Sessions ========== */

    async fn create_session(&self, session: &Session) -> Result<()> {
        let mut data = self.data.lock().await;
        // also drops expired sessions whose cookie is never presented again
        let now = Utc::now().naive_utc();
        let mut sessions: Vec<Session> =
            data.sessions.iter().filter(|s| !s.is_expired(now)).cloned().collect();
        sessions.push(session.clone());

        self.commit(Staged::default().put(SESSIONS_FILE, &sessions)?).await?;
        data.sessions = sessions;
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let data = self.data.lock().await;
        Ok(data.sessions.iter().find(|s| s.token == token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        if !data.sessions.iter().any(|s| s.token == token) {
            return Ok(());
        }
        let sessions: Vec<Session> =
            data.sessions.iter().filter(|s| s.token != token).cloned().collect();

        self.commit(Staged::default().put(SESSIONS_FILE, &sessions)?).await?;
        data.sessions = sessions;
        Ok(())
    }

    /* ========== Settings ========== */

    async fn get_setting(&self, user_id: i64, key: &str) -> Result<Option<String>> {
        let data = self.data.lock().await;
        Ok(data
            .settings
            .iter()
            .find(|s| s.user_id == user_id && s.key == key)
            .map(|s| s.value.clone()))
    }

    async fn set_setting(&self, user_id: i64, key: &str, value: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        let mut settings = data.settings.clone();
        match settings
            .iter()
            .position(|s| s.user_id == user_id && s.key == key)
        {
            Some(i) => settings[i].value = value.to_string(),
            None => settings.push(SettingRecord {
                user_id,
                key: key.to_string(),
                value: value.to_string(),
            }),
        }

        self.commit(Staged::default().put(SETTINGS_FILE, &settings)?).await?;
        data.settings = settings;
        Ok(())
    }
}
