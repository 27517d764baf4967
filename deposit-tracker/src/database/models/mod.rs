pub mod bank;
pub mod deposit;
pub mod settings;
pub mod summary;
pub mod user;

pub use bank::{Bank, BankPatch, NewBank};
pub use deposit::{Deposit, DepositPatch, DepositView, NewDeposit};
pub use settings::{SettingRecord, Settings};
pub use summary::Summary;
pub use user::{NewUser, Session, User};
