//! HTML form payloads and their validation.
//!
//! Every field arrives as a string so that a missing or malformed value
//! becomes a message on the re-rendered form instead of an extractor
//! rejection.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::database::models::{Bank, Deposit, NewBank, NewDeposit};
use crate::util::{iso, parse_date, parse_money};

#[derive(Default)]
struct FieldErrors(Vec<String>);

impl FieldErrors {
    fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    fn required(&mut self, label: &str, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            self.push(format!("{} is required", label));
            return None;
        }
        Some(value.to_string())
    }

    fn decimal(&mut self, label: &str, value: &str) -> Option<Decimal> {
        if value.trim().is_empty() {
            self.push(format!("{} is required", label));
            return None;
        }
        let parsed = parse_money(value);
        if parsed.is_none() {
            self.push(format!("{} must be a number", label));
        }
        parsed
    }

    fn date(&mut self, label: &str, value: &str) -> Option<NaiveDate> {
        if value.trim().is_empty() {
            self.push(format!("{} is required", label));
            return None;
        }
        let parsed = parse_date(value);
        if parsed.is_none() {
            self.push(format!("{} must be a date (YYYY-MM-DD)", label));
        }
        parsed
    }
}

fn capitalize(s: String) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => s,
    }
}

/* ========== Deposits ========== */

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DepositForm {
    pub account_holder: String,
    pub account_number: String,
    pub bank_name: String,
    pub principal_amount: String,
    pub interest_rate: String,
    pub tax_rate: String,
    pub deposit_date: String,
    pub maturity_date: String,
}

impl DepositForm {
    pub fn blank(default_tax_rate: Decimal, today: NaiveDate) -> Self {
        DepositForm {
            tax_rate: default_tax_rate.normalize().to_string(),
            deposit_date: iso(&today),
            ..Default::default()
        }
    }

    pub fn from_deposit(d: &Deposit) -> Self {
        DepositForm {
            account_holder: d.account_holder.clone(),
            account_number: d.account_number.clone(),
            bank_name: d.bank_name.clone(),
            principal_amount: d.principal_amount.to_string(),
            interest_rate: d.interest_rate.to_string(),
            tax_rate: d.tax_rate.to_string(),
            deposit_date: iso(&d.deposit_date),
            maturity_date: iso(&d.maturity_date),
        }
    }

    /// A blank interest rate falls back to the named bank's default rate and
    /// a blank tax rate to `default_tax_rate`.
    pub fn parse(&self, default_tax_rate: Decimal, banks: &[NewBank]) -> Result<NewDeposit, Vec<String>> {
        let mut errs = FieldErrors::default();

        let account_holder = errs.required("Account holder", &self.account_holder);
        let account_number = errs.required("Account number", &self.account_number);
        let bank_name = errs.required("Bank", &self.bank_name);
        let principal_amount = errs.decimal("Principal amount", &self.principal_amount);

        let interest_rate = if self.interest_rate.trim().is_empty() {
            let bank = banks.iter().find(|b| b.name == self.bank_name.trim());
            if bank.is_none() {
                errs.push("Interest rate is required");
            }
            bank.map(|b| b.default_interest_rate)
        } else {
            errs.decimal("Interest rate", &self.interest_rate)
        };

        let tax_rate = if self.tax_rate.trim().is_empty() {
            Some(default_tax_rate)
        } else {
            errs.decimal("Tax rate", &self.tax_rate)
        };

        let deposit_date = errs.date("Deposit date", &self.deposit_date);
        let maturity_date = errs.date("Maturity date", &self.maturity_date);

        match (
            account_holder,
            account_number,
            bank_name,
            principal_amount,
            interest_rate,
            tax_rate,
            deposit_date,
            maturity_date,
        ) {
            (
                Some(account_holder),
                Some(account_number),
                Some(bank_name),
                Some(principal_amount),
                Some(interest_rate),
                Some(tax_rate),
                Some(deposit_date),
                Some(maturity_date),
            ) if errs.0.is_empty() => {
                let new = NewDeposit {
                    account_holder,
                    account_number,
                    bank_name,
                    principal_amount,
                    interest_rate,
                    tax_rate,
                    deposit_date,
                    maturity_date,
                };
                new.validate()
                    .map_err(|e| vec![capitalize(e.to_string())])?;
                Ok(new)
            }
            _ => Err(errs.0),
        }
    }
}

/* ========== Banks ========== */

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BankForm {
    pub name: String,
    pub default_interest_rate: String,
}

impl BankForm {
    pub fn from_bank(b: &Bank) -> Self {
        BankForm {
            name: b.name.clone(),
            default_interest_rate: b.default_interest_rate.to_string(),
        }
    }

    pub fn parse(&self) -> Result<NewBank, Vec<String>> {
        let mut errs = FieldErrors::default();
        let name = errs.required("Bank name", &self.name);
        let rate = errs.decimal("Default interest rate", &self.default_interest_rate);

        if let Some(r) = rate {
            if r < Decimal::ZERO {
                errs.push("Default interest rate cannot be negative");
            }
        }

        match (name, rate) {
            (Some(name), Some(default_interest_rate)) if errs.0.is_empty() => Ok(NewBank {
                name,
                default_interest_rate,
            }),
            _ => Err(errs.0),
        }
    }
}

/* ========== Settings ========== */

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SettingsForm {
    pub default_tax_rate: String,
    pub currency_symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub default_tax_rate: Decimal,
    /// `None` keeps the current symbol.
    pub currency_symbol: Option<String>,
}

impl SettingsForm {
    pub fn parse(&self) -> Result<SettingsUpdate, Vec<String>> {
        let mut errs = FieldErrors::default();
        let rate = errs.decimal("Default tax rate", &self.default_tax_rate);

        if let Some(r) = rate {
            if r < Decimal::ZERO || r > Decimal::ONE_HUNDRED {
                errs.push("Default tax rate must be between 0 and 100");
            }
        }

        let symbol = self.currency_symbol.trim();
        match rate {
            Some(default_tax_rate) if errs.0.is_empty() => Ok(SettingsUpdate {
                default_tax_rate,
                currency_symbol: (!symbol.is_empty()).then(|| symbol.to_string()),
            }),
            _ => Err(errs.0),
        }
    }
}

/* ========== Users ========== */

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewUserForm {
    pub username: String,
    pub password: String,
    /// Checkbox: present ("on") when ticked, absent otherwise.
    pub is_admin: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordForm {
    pub new_password: String,
}
