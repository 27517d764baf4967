use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TAX_RATE_KEY: &str = "default_tax_rate";
pub const CURRENCY_SYMBOL_KEY: &str = "currency_symbol";

/// One stored `(user, key) -> value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRecord {
    pub user_id: i64,
    pub key: String,
    pub value: String,
}

/// Effective settings of a user after falling back to the global defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub default_tax_rate: Decimal,
    pub currency_symbol: String,
}
