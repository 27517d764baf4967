use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::calculation::DEFAULT_TAX_RATE;
use crate::database::models::NewBank;

/// Where records are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Sqlite { url: String },
    Json { dir: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub backend: Backend,
    /// Master key for the private cookies. At least 32 bytes.
    pub secret_key: String,
    pub default_tax_rate: Decimal,
    pub currency_symbol: String,
    pub session_ttl_hours: i64,
    /// Banks offered to users who have not set up any of their own.
    pub default_banks: Vec<NewBank>,
    pub bcrypt_cost: u32,
    pub admin_username: String,
    pub admin_password: String,
    /// Set when SECRET_KEY was not configured and a random one was generated.
    pub ephemeral_secret: bool,
}

const MIN_SECRET_LEN: usize = 32;

/// One year.
const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;

impl Config {
    /// Reads the process environment (after `.env` has been loaded by the caller).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let bind_addr = get("BIND_ADDR", "127.0.0.1:3000")
            .parse()
            .context("BIND_ADDR must be a socket address such as 127.0.0.1:3000")?;

        let backend = match get("STORE_BACKEND", "sqlite").to_ascii_lowercase().as_str() {
            "sqlite" => Backend::Sqlite {
                url: get("DATABASE_URL", "sqlite://./data/bank_deposits.db"),
            },
            "json" => Backend::Json {
                dir: PathBuf::from(get("DATA_DIR", "./data")),
            },
            other => bail!("STORE_BACKEND must be 'sqlite' or 'json', got '{}'", other),
        };

        let (secret_key, ephemeral_secret) = match lookup("SECRET_KEY").filter(|v| !v.is_empty()) {
            Some(key) if key.len() < MIN_SECRET_LEN => {
                bail!("SECRET_KEY must be at least {} bytes long", MIN_SECRET_LEN)
            }
            Some(key) => (key, false),
            None => (
                format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple()),
                true,
            ),
        };

        let default_tax_rate = Decimal::from_str(&get("DEFAULT_TAX_RATE", &DEFAULT_TAX_RATE.to_string()))
            .context("DEFAULT_TAX_RATE must be a decimal number")?;
        if default_tax_rate < Decimal::ZERO || default_tax_rate > Decimal::ONE_HUNDRED {
            bail!("DEFAULT_TAX_RATE must be between 0 and 100");
        }

        let session_ttl_hours: i64 = get("SESSION_TTL_HOURS", "12")
            .parse()
            .context("SESSION_TTL_HOURS must be a whole number of hours")?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
            bail!("SESSION_TTL_HOURS must be between 1 and {}", MAX_SESSION_TTL_HOURS);
        }

        let default_banks = parse_banks(&get("DEFAULT_BANKS", ""))?;

        let bcrypt_cost: u32 = get("BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())
            .parse()
            .context("BCRYPT_COST must be a whole number")?;
        if !(4..=31).contains(&bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31");
        }

        Ok(Config {
            bind_addr,
            backend,
            secret_key,
            default_tax_rate,
            currency_symbol: get("CURRENCY_SYMBOL", "Rp"),
            session_ttl_hours,
            default_banks,
            bcrypt_cost,
            admin_username: get("ADMIN_USERNAME", "admin"),
            admin_password: get("ADMIN_PASSWORD", "admin123"),
            ephemeral_secret,
        })
    }
}

/// Parses `Name:rate` pairs separated by commas, e.g. `Mandiri:4.5,BCA:3.25`.
fn parse_banks(raw: &str) -> Result<Vec<NewBank>> {
    let mut banks: Vec<NewBank> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, rate) = entry
            .rsplit_once(':')
            .with_context(|| format!("DEFAULT_BANKS entry '{}' must look like Name:rate", entry))?;
        let name = name.trim();
        let default_interest_rate = Decimal::from_str(rate.trim())
            .with_context(|| format!("DEFAULT_BANKS rate for '{}' must be a decimal number", name))?;
        if name.is_empty() || default_interest_rate < Decimal::ZERO {
            bail!("DEFAULT_BANKS entry '{}' needs a name and a non-negative rate", entry);
        }
        if banks.iter().any(|b| b.name == name) {
            bail!("DEFAULT_BANKS lists {} twice", name);
        }
        banks.push(NewBank { name: name.to_string(), default_interest_rate });
    }
    banks.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(banks)
}
