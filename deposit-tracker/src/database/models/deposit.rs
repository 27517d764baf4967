use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{self, CalcError, Figures, Terms};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: i64,
    pub user_id: i64,
    pub account_holder: String,
    pub account_number: String,
    pub bank_name: String,          // refers to Bank::name, not enforced
    pub principal_amount: Decimal,
    pub interest_rate: Decimal,     // annual, percent
    pub tax_rate: Decimal,          // percent of interest
    pub deposit_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Fields supplied by the user when a deposit is created or fully replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeposit {
    pub account_holder: String,
    pub account_number: String,
    pub bank_name: String,
    pub principal_amount: Decimal,
    pub interest_rate: Decimal,
    pub tax_rate: Decimal,
    pub deposit_date: NaiveDate,
    pub maturity_date: NaiveDate,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositPatch {
    pub account_holder: Option<String>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub principal_amount: Option<Decimal>,
    pub interest_rate: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub deposit_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
}

/// A deposit together with everything derived from it, as listed by the API.
#[derive(Debug, Clone, Serialize)]
pub struct DepositView {
    #[serde(flatten)]
    pub deposit: Deposit,
    pub reference: String,
    #[serde(flatten)]
    pub figures: Figures,
    pub is_matured: bool,
}

impl NewDeposit {
    pub fn terms(&self) -> Terms {
        Terms {
            principal: self.principal_amount,
            annual_rate: self.interest_rate,
            tax_rate: self.tax_rate,
            deposit_date: self.deposit_date,
            maturity_date: self.maturity_date,
        }
    }

    pub fn validate(&self) -> Result<(), CalcError> {
        self.terms().validate()
    }
}

impl Deposit {
    pub fn terms(&self) -> Terms {
        Terms {
            principal: self.principal_amount,
            annual_rate: self.interest_rate,
            tax_rate: self.tax_rate,
            deposit_date: self.deposit_date,
            maturity_date: self.maturity_date,
        }
    }

    /// Human-facing reference such as `DEP007`.
    pub fn reference(&self) -> String {
        format!("DEP{:03}", self.id)
    }

    pub fn figures(&self) -> Result<Figures, CalcError> {
        calculation::compute(&self.terms())
    }

    pub fn view(self, today: NaiveDate) -> Result<DepositView, CalcError> {
        let figures = self.figures()?;
        Ok(DepositView {
            reference: self.reference(),
            is_matured: calculation::is_matured(self.maturity_date, today),
            figures,
            deposit: self,
        })
    }

    pub fn to_new(&self) -> NewDeposit {
        NewDeposit {
            account_holder: self.account_holder.clone(),
            account_number: self.account_number.clone(),
            bank_name: self.bank_name.clone(),
            principal_amount: self.principal_amount,
            interest_rate: self.interest_rate,
            tax_rate: self.tax_rate,
            deposit_date: self.deposit_date,
            maturity_date: self.maturity_date,
        }
    }
}

impl DepositPatch {
    pub fn apply(self, mut base: NewDeposit) -> NewDeposit {
        if let Some(v) = self.account_holder { base.account_holder = v; }
        if let Some(v) = self.account_number { base.account_number = v; }
        if let Some(v) = self.bank_name { base.bank_name = v; }
        if let Some(v) = self.principal_amount { base.principal_amount = v; }
        if let Some(v) = self.interest_rate { base.interest_rate = v; }
        if let Some(v) = self.tax_rate { base.tax_rate = v; }
        if let Some(v) = self.deposit_date { base.deposit_date = v; }
        if let Some(v) = self.maturity_date { base.maturity_date = v; }
        base
    }
}

impl From<NewDeposit> for DepositPatch {
    fn from(d: NewDeposit) -> Self {
        DepositPatch {
            account_holder: Some(d.account_holder),
            account_number: Some(d.account_number),
            bank_name: Some(d.bank_name),
            principal_amount: Some(d.principal_amount),
            interest_rate: Some(d.interest_rate),
            tax_rate: Some(d.tax_rate),
            deposit_date: Some(d.deposit_date),
            maturity_date: Some(d.maturity_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Deposit {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
        Deposit {
            id: 7,
            user_id: 1,
            account_holder: "Siti".to_string(),
            account_number: "123-456".to_string(),
            bank_name: "BCA".to_string(),
            principal_amount: dec!(10000000),
            interest_rate: dec!(6),
            tax_rate: dec!(20),
            deposit_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            maturity_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_reference_is_zero_padded() {
        assert_eq!(sample().reference(), "DEP007");
        assert_eq!(Deposit { id: 1234, ..sample() }.reference(), "DEP1234");
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let patch = DepositPatch {
            interest_rate: Some(dec!(7.25)),
            ..Default::default()
        };
        let updated = patch.apply(sample().to_new());

        assert_eq!(updated.interest_rate, dec!(7.25));
        assert_eq!(updated.account_holder, "Siti");
        assert_eq!(updated.principal_amount, dec!(10000000));
    }

    #[test]
    fn test_view_serializes_derived_fields() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let view = sample().view(today).unwrap();
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["reference"], "DEP007");
        assert_eq!(json["principal_amount"], "10000000");
        assert_eq!(json["interest_before_tax"], "601232.03");
        assert_eq!(json["maturity_total"], "10480985.62");
        assert_eq!(json["days_period"], 366);
        assert_eq!(json["is_matured"], true);
    }
}
