//! Behaviour every `Store` backend must share, run against SQLite and JSON.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use deposit_tracker::calculation::{CalcError, MAX_PRINCIPAL};
use deposit_tracker::database::db::{JsonStore, SqliteStore};
use deposit_tracker::database::models::{
    BankPatch, DepositPatch, NewBank, NewDeposit, NewUser, Session, User,
};
use deposit_tracker::database::{Store, StoreError};

async fn sqlite_store() -> SqliteStore {
    SqliteStore::open("sqlite::memory:").await.unwrap()
}

async fn json_store() -> (TempDir, JsonStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::open(dir.path()).await.unwrap();
    (dir, store)
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn deposit(holder: &str) -> NewDeposit {
    NewDeposit {
        account_holder: holder.to_string(),
        account_number: "0012-3456".to_string(),
        bank_name: "Mandiri".to_string(),
        principal_amount: dec!(10000000),
        interest_rate: dec!(6),
        tax_rate: dec!(20),
        deposit_date: date("2024-01-01"),
        maturity_date: date("2025-01-01"),
    }
}

async fn user(store: &dyn Store, name: &str) -> User {
    store
        .create_user(&NewUser {
            username: name.to_string(),
            password_hash: "hash".to_string(),
            is_admin: false,
        })
        .await
        .unwrap()
}

/* ========== Contract ========== */

async fn deposit_lifecycle(store: &dyn Store) {
    let u = user(store, "budi").await;

    let first = store.create_deposit(u.id, &deposit("Budi")).await.unwrap();
    let second = store.create_deposit(u.id, &deposit("Sari")).await.unwrap();
    assert!(second.id > first.id);
    assert_eq!(first.principal_amount, dec!(10000000));

    let fetched = store.get_deposit(u.id, first.id).await.unwrap().unwrap();
    assert_eq!(fetched, first);

    let listed = store.list_deposits(u.id).await.unwrap();
    assert_eq!(listed.iter().map(|d| d.id).collect::<Vec<_>>(), vec![first.id, second.id]);

    let patch = DepositPatch { principal_amount: Some(dec!(25000000)), ..Default::default() };
    let updated = store.update_deposit(u.id, first.id, patch).await.unwrap();
    assert_eq!(updated.principal_amount, dec!(25000000));
    assert_eq!(updated.account_holder, "Budi");
    assert_eq!(updated.maturity_date, date("2025-01-01"));
    assert_eq!(updated.created_at, first.created_at);

    store.delete_deposit(u.id, first.id).await.unwrap();
    assert!(store.get_deposit(u.id, first.id).await.unwrap().is_none());
    assert!(matches!(
        store.delete_deposit(u.id, first.id).await,
        Err(StoreError::NotFound { .. })
    ));
    assert_eq!(store.list_deposits(u.id).await.unwrap().len(), 1);
}

async fn invalid_deposits_are_not_stored(store: &dyn Store) {
    let u = user(store, "budi").await;

    let backwards = NewDeposit { maturity_date: date("2023-12-31"), ..deposit("Budi") };
    assert!(matches!(
        store.create_deposit(u.id, &backwards).await,
        Err(StoreError::Calc(_))
    ));
    let blank = NewDeposit { account_holder: "  ".into(), ..deposit("Budi") };
    assert!(matches!(store.create_deposit(u.id, &blank).await, Err(StoreError::Invalid(_))));
    assert!(store.list_deposits(u.id).await.unwrap().is_empty());

    let huge = NewDeposit { principal_amount: MAX_PRINCIPAL + dec!(1), ..deposit("Budi") };
    assert!(matches!(
        store.create_deposit(u.id, &huge).await,
        Err(StoreError::Calc(CalcError::PrincipalTooLarge { .. }))
    ));
    assert!(store.list_deposits(u.id).await.unwrap().is_empty());

    let stored = store.create_deposit(u.id, &deposit("Budi")).await.unwrap();
    let patch = DepositPatch { tax_rate: Some(dec!(150)), ..Default::default() };
    assert!(store.update_deposit(u.id, stored.id, patch).await.is_err());
    assert_eq!(store.get_deposit(u.id, stored.id).await.unwrap().unwrap(), stored);

    let backwards = DepositPatch { maturity_date: Some(date("2023-12-31")), ..Default::default() };
    assert!(matches!(
        store.update_deposit(u.id, stored.id, backwards).await,
        Err(StoreError::Calc(CalcError::MaturityBeforeDeposit { .. }))
    ));
    let overflowing = DepositPatch { principal_amount: Some(Decimal::MAX), ..Default::default() };
    assert!(matches!(
        store.update_deposit(u.id, stored.id, overflowing).await,
        Err(StoreError::Calc(CalcError::PrincipalTooLarge { .. }))
    ));
    assert_eq!(store.get_deposit(u.id, stored.id).await.unwrap().unwrap(), stored);

    assert!(matches!(
        store.update_deposit(u.id, stored.id + 100, DepositPatch::default()).await,
        Err(StoreError::NotFound { .. })
    ));
}

async fn ids_are_not_reused_after_delete(store: &dyn Store) {
    let u = user(store, "budi").await;
    store.create_deposit(u.id, &deposit("Budi")).await.unwrap();
    let newest = store.create_deposit(u.id, &deposit("Sari")).await.unwrap();
    store.delete_deposit(u.id, newest.id).await.unwrap();
    let next = store.create_deposit(u.id, &deposit("Rina")).await.unwrap();
    assert!(next.id > newest.id);

    let bank = store
        .create_bank(u.id, &NewBank { name: "BNI".into(), default_interest_rate: dec!(5) })
        .await
        .unwrap();
    store.delete_bank(u.id, bank.id).await.unwrap();
    let again = store
        .create_bank(u.id, &NewBank { name: "BNI".into(), default_interest_rate: dec!(5) })
        .await
        .unwrap();
    assert!(again.id > bank.id);

    let gone = user(store, "sari").await;
    store.delete_user(gone.id).await.unwrap();
    assert!(user(store, "rina").await.id > gone.id);
}

async fn deposits_are_scoped_to_their_owner(store: &dyn Store) {
    let budi = user(store, "budi").await;
    let sari = user(store, "sari").await;
    let d = store.create_deposit(budi.id, &deposit("Budi")).await.unwrap();

    assert!(store.get_deposit(sari.id, d.id).await.unwrap().is_none());
    assert!(store.list_deposits(sari.id).await.unwrap().is_empty());
    assert!(matches!(
        store.delete_deposit(sari.id, d.id).await,
        Err(StoreError::NotFound { .. })
    ));
    assert!(store.get_deposit(budi.id, d.id).await.unwrap().is_some());
}

async fn bank_lifecycle(store: &dyn Store) {
    let budi = user(store, "budi").await;
    let sari = user(store, "sari").await;

    let mandiri = store
        .create_bank(budi.id, &NewBank { name: "Mandiri".into(), default_interest_rate: dec!(4.5) })
        .await
        .unwrap();
    store
        .create_bank(budi.id, &NewBank { name: "BCA".into(), default_interest_rate: dec!(3.25) })
        .await
        .unwrap();

    let duplicate = NewBank { name: "Mandiri".into(), default_interest_rate: dec!(5) };
    assert!(matches!(
        store.create_bank(budi.id, &duplicate).await,
        Err(StoreError::Conflict(_))
    ));
    store.create_bank(sari.id, &duplicate).await.unwrap();

    let names: Vec<String> = store
        .list_banks(budi.id)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["BCA", "Mandiri"]);

    let found = store.find_bank_by_name(budi.id, "Mandiri").await.unwrap().unwrap();
    assert_eq!(found.default_interest_rate, dec!(4.5));

    let patch = BankPatch { default_interest_rate: Some(dec!(4.75)), ..Default::default() };
    let updated = store.update_bank(budi.id, mandiri.id, patch).await.unwrap();
    assert_eq!(updated.name, "Mandiri");
    assert_eq!(updated.default_interest_rate, dec!(4.75));

    let rename = BankPatch { name: Some("BCA".into()), ..Default::default() };
    assert!(matches!(
        store.update_bank(budi.id, mandiri.id, rename).await,
        Err(StoreError::Conflict(_))
    ));

    let negative = BankPatch { default_interest_rate: Some(dec!(-1)), ..Default::default() };
    assert!(matches!(
        store.update_bank(budi.id, mandiri.id, negative).await,
        Err(StoreError::Invalid(_))
    ));

    // deposits keep their bank name after the bank goes away
    let d = store.create_deposit(budi.id, &deposit("Budi")).await.unwrap();
    store.delete_bank(budi.id, mandiri.id).await.unwrap();
    assert!(store.find_bank_by_name(budi.id, "Mandiri").await.unwrap().is_none());
    assert_eq!(store.get_deposit(budi.id, d.id).await.unwrap().unwrap().bank_name, "Mandiri");
    assert!(matches!(
        store.delete_bank(budi.id, mandiri.id).await,
        Err(StoreError::NotFound { .. })
    ));
}

async fn users_and_cascading_delete(store: &dyn Store) {
    assert_eq!(store.count_users().await.unwrap(), 0);
    let budi = user(store, "budi").await;
    let sari = user(store, "sari").await;
    assert_eq!(store.count_users().await.unwrap(), 2);

    assert!(matches!(
        store
            .create_user(&NewUser {
                username: "budi".into(),
                password_hash: "x".into(),
                is_admin: true,
            })
            .await,
        Err(StoreError::Conflict(_))
    ));

    let by_name = store.get_user_by_username("sari").await.unwrap().unwrap();
    assert_eq!(by_name.id, sari.id);
    assert!(store.get_user_by_username("nobody").await.unwrap().is_none());

    store.update_user_password(budi.id, "new-hash").await.unwrap();
    assert_eq!(store.get_user(budi.id).await.unwrap().unwrap().password_hash, "new-hash");

    store.create_deposit(budi.id, &deposit("Budi")).await.unwrap();
    store
        .create_bank(budi.id, &NewBank { name: "BNI".into(), default_interest_rate: dec!(5) })
        .await
        .unwrap();
    store.set_setting(budi.id, "currency_symbol", "$").await.unwrap();
    let now = Utc::now().naive_utc();
    store
        .create_session(&Session {
            token: "budi-token".into(),
            user_id: budi.id,
            created_at: now,
            expires_at: now + Duration::hours(1),
        })
        .await
        .unwrap();

    store.delete_user(budi.id).await.unwrap();
    assert!(store.get_user(budi.id).await.unwrap().is_none());
    assert!(store.list_deposits(budi.id).await.unwrap().is_empty());
    assert!(store.list_banks(budi.id).await.unwrap().is_empty());
    assert!(store.get_setting(budi.id, "currency_symbol").await.unwrap().is_none());
    assert!(store.get_session("budi-token").await.unwrap().is_none());
    assert!(matches!(store.delete_user(budi.id).await, Err(StoreError::NotFound { .. })));

    let remaining: Vec<String> = store.list_users().await.unwrap().into_iter().map(|u| u.username).collect();
    assert_eq!(remaining, vec!["sari"]);
}

async fn sessions(store: &dyn Store) {
    let u = user(store, "budi").await;
    let now = Utc::now().naive_utc();
    let session = Session {
        token: "abc".into(),
        user_id: u.id,
        created_at: now,
        expires_at: now + Duration::hours(12),
    };

    store.create_session(&session).await.unwrap();
    let stored = store.get_session("abc").await.unwrap().unwrap();
    assert_eq!(stored.user_id, u.id);
    assert!(!stored.is_expired(now));

    store.delete_session("abc").await.unwrap();
    assert!(store.get_session("abc").await.unwrap().is_none());
    store.delete_session("abc").await.unwrap();
}

async fn expired_sessions_are_dropped_on_login(store: &dyn Store) {
    let u = user(store, "budi").await;
    let now = Utc::now().naive_utc();
    store
        .create_session(&Session {
            token: "stale".into(),
            user_id: u.id,
            created_at: now - Duration::hours(13),
            expires_at: now - Duration::hours(1),
        })
        .await
        .unwrap();
    store
        .create_session(&Session {
            token: "fresh".into(),
            user_id: u.id,
            created_at: now,
            expires_at: now + Duration::hours(12),
        })
        .await
        .unwrap();

    assert!(store.get_session("stale").await.unwrap().is_none());
    assert!(store.get_session("fresh").await.unwrap().is_some());
}

async fn settings(store: &dyn Store) {
    let u = user(store, "budi").await;
    assert!(store.get_setting(u.id, "default_tax_rate").await.unwrap().is_none());

    store.set_setting(u.id, "default_tax_rate", "15").await.unwrap();
    store.set_setting(u.id, "default_tax_rate", "10").await.unwrap();
    assert_eq!(
        store.get_setting(u.id, "default_tax_rate").await.unwrap().as_deref(),
        Some("10")
    );
}

macro_rules! contract {
    ($($case:ident),* $(,)?) => {
        mod sqlite {
            $(
                #[tokio::test]
                async fn $case() {
                    let store = super::sqlite_store().await;
                    super::$case(&store).await;
                }
            )*
        }

        mod json {
            $(
                #[tokio::test]
                async fn $case() {
                    let (_dir, store) = super::json_store().await;
                    super::$case(&store).await;
                }
            )*
        }
    };
}

contract!(
    deposit_lifecycle,
    invalid_deposits_are_not_stored,
    ids_are_not_reused_after_delete,
    deposits_are_scoped_to_their_owner,
    bank_lifecycle,
    users_and_cascading_delete,
    sessions,
    expired_sessions_are_dropped_on_login,
    settings,
);

#[tokio::test]
async fn test_json_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let store = JsonStore::open(dir.path()).await.unwrap();
        let u = user(&store, "budi").await;
        store.create_deposit(u.id, &deposit("Budi")).await.unwrap().id
    };

    let reopened = JsonStore::open(dir.path()).await.unwrap();
    let u = reopened.get_user_by_username("budi").await.unwrap().unwrap();
    let d = reopened.get_deposit(u.id, id).await.unwrap().unwrap();
    assert_eq!(d.principal_amount, dec!(10000000));
}
