//! Interest, tax and maturity figures for a fixed-term deposit.
//!
//! Everything here is a pure function of the deposit's scalar fields. Figures
//! are recomputed on every read and never persisted.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;

/// Day-count basis for a year, averaging in leap years.
pub const DAYS_PER_YEAR: Decimal = dec!(365.25);

pub const DEFAULT_TAX_RATE: Decimal = dec!(20);

/// Largest principal accepted, in currency units.
pub const MAX_PRINCIPAL: Decimal = dec!(1000000000000000);

/// Largest annual rate accepted, in percent.
pub const MAX_RATE: Decimal = dec!(1000);

const HUNDRED: Decimal = dec!(100);

/// `100 * DAYS_PER_YEAR`: turns principal x percent x days into money.
const RATE_DAY_BASIS: Decimal = dec!(36525);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    #[error("principal amount must be greater than zero (got {0})")]
    NonPositivePrincipal(Decimal),

    #[error("principal amount cannot exceed {max} (got {got})")]
    PrincipalTooLarge { got: Decimal, max: Decimal },

    #[error("interest rate cannot be negative (got {0})")]
    NegativeRate(Decimal),

    #[error("interest rate cannot exceed {max}% (got {got})")]
    RateTooLarge { got: Decimal, max: Decimal },

    #[error("tax rate must be between 0 and 100 (got {0})")]
    TaxRateOutOfRange(Decimal),

    #[error("maturity date {maturity} is before deposit date {deposit}")]
    MaturityBeforeDeposit {
        deposit: NaiveDate,
        maturity: NaiveDate,
    },

    #[error("amount is too large to calculate")]
    Overflow,
}

/// The scalar inputs of a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terms {
    pub principal: Decimal,
    /// annual rate in percent
    pub annual_rate: Decimal,
    /// percent of the interest withheld
    pub tax_rate: Decimal,
    pub deposit_date: NaiveDate,
    pub maturity_date: NaiveDate,
}

/// Derived figures for a deposit. Money is rounded to cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Figures {
    pub days_period: i64,
    pub elapsed_years: Decimal,
    pub interest_before_tax: Decimal,
    pub tax_amount: Decimal,
    pub interest_after_tax: Decimal,
    pub maturity_total: Decimal,
    pub daily_interest_before_tax: Decimal,
    pub daily_interest_after_tax: Decimal,
}

impl Terms {
    /// Checks the inputs without computing anything.
    pub fn validate(&self) -> Result<(), CalcError> {
        if self.principal <= Decimal::ZERO {
            return Err(CalcError::NonPositivePrincipal(self.principal));
        }
        if self.principal > MAX_PRINCIPAL {
            return Err(CalcError::PrincipalTooLarge { got: self.principal, max: MAX_PRINCIPAL });
        }
        if self.annual_rate < Decimal::ZERO {
            return Err(CalcError::NegativeRate(self.annual_rate));
        }
        if self.annual_rate > MAX_RATE {
            return Err(CalcError::RateTooLarge { got: self.annual_rate, max: MAX_RATE });
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > HUNDRED {
            return Err(CalcError::TaxRateOutOfRange(self.tax_rate));
        }
        if self.maturity_date < self.deposit_date {
            return Err(CalcError::MaturityBeforeDeposit {
                deposit: self.deposit_date,
                maturity: self.maturity_date,
            });
        }
        Ok(())
    }

    pub fn days_period(&self) -> i64 {
        (self.maturity_date - self.deposit_date).num_days()
    }
}

pub fn compute(terms: &Terms) -> Result<Figures, CalcError> {
    terms.validate()?;

    let days = terms.days_period();
    let days_dec = Decimal::from(days);

    // multiply before dividing so the only inexact step is the final division
    let accrued = mul(mul(terms.principal, terms.annual_rate)?, days_dec)?;
    let interest_before_tax = money(accrued / RATE_DAY_BASIS);
    let tax_amount = money(mul(interest_before_tax, terms.tax_rate)? / HUNDRED);
    let interest_after_tax = interest_before_tax - tax_amount;
    let maturity_total = terms
        .principal
        .checked_add(interest_after_tax)
        .ok_or(CalcError::Overflow)?;

    let daily = mul(terms.principal, terms.annual_rate)? / RATE_DAY_BASIS;
    let daily_interest_after_tax = money(mul(daily, HUNDRED - terms.tax_rate)? / HUNDRED);

    Ok(Figures {
        days_period: days,
        elapsed_years: (days_dec / DAYS_PER_YEAR)
            .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero),
        interest_before_tax,
        tax_amount,
        interest_after_tax,
        maturity_total,
        daily_interest_before_tax: money(daily),
        daily_interest_after_tax,
    })
}

/// A deposit is matured once its maturity date has been reached.
pub fn is_matured(maturity_date: NaiveDate, today: NaiveDate) -> bool {
    today >= maturity_date
}

fn mul(a: Decimal, b: Decimal) -> Result<Decimal, CalcError> {
    a.checked_mul(b).ok_or(CalcError::Overflow)
}

fn money(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn terms(principal: Decimal, rate: Decimal, tax: Decimal, from: &str, to: &str) -> Terms {
        Terms {
            principal,
            annual_rate: rate,
            tax_rate: tax,
            deposit_date: date(from),
            maturity_date: date(to),
        }
    }

    #[test]
    fn test_one_leap_year_deposit() {
        let t = terms(dec!(10000000), dec!(6), dec!(20), "2024-01-01", "2025-01-01");
        let f = compute(&t).unwrap();

        assert_eq!(f.days_period, 366);
        assert_eq!(f.elapsed_years, dec!(1.0021));
        assert_eq!(f.interest_before_tax, dec!(601232.03));
        assert_eq!(f.tax_amount, dec!(120246.41));
        assert_eq!(f.interest_after_tax, dec!(480985.62));
        assert_eq!(f.maturity_total, dec!(10480985.62));
        assert_eq!(f.daily_interest_before_tax, dec!(1642.71));
        assert_eq!(f.daily_interest_after_tax, dec!(1314.17));
    }

    #[test]
    fn test_ninety_day_deposit() {
        let t = terms(dec!(50000000), dec!(5), dec!(20), "2024-03-01", "2024-05-30");
        let f = compute(&t).unwrap();

        assert_eq!(f.days_period, 90);
        assert_eq!(f.interest_before_tax, dec!(616016.43));
        assert_eq!(f.tax_amount, dec!(123203.29));
        assert_eq!(f.maturity_total, dec!(50492813.14));
    }

    #[test]
    fn test_zero_rate_is_zero_interest() {
        let t = terms(dec!(1000), dec!(0), dec!(20), "2024-01-01", "2024-12-31");
        let f = compute(&t).unwrap();

        assert_eq!(f.interest_before_tax, Decimal::ZERO);
        assert_eq!(f.interest_after_tax, Decimal::ZERO);
        assert_eq!(f.maturity_total, dec!(1000));
    }

    #[test]
    fn test_zero_tax_keeps_all_interest() {
        let t = terms(dec!(250000), dec!(4.5), dec!(0), "2024-01-01", "2024-07-01");
        let f = compute(&t).unwrap();

        assert_eq!(f.tax_amount, Decimal::ZERO);
        assert_eq!(f.interest_after_tax, f.interest_before_tax);
        assert_eq!(f.daily_interest_after_tax, f.daily_interest_before_tax);
    }

    #[test]
    fn test_same_day_maturity() {
        let t = terms(dec!(1000), dec!(5), dec!(20), "2024-06-01", "2024-06-01");
        let f = compute(&t).unwrap();

        assert_eq!(f.days_period, 0);
        assert_eq!(f.elapsed_years, Decimal::ZERO);
        assert_eq!(f.maturity_total, dec!(1000));
    }

    #[test]
    fn test_maturity_before_deposit_is_rejected() {
        let t = terms(dec!(1000), dec!(5), dec!(20), "2024-06-02", "2024-06-01");
        assert_eq!(
            compute(&t),
            Err(CalcError::MaturityBeforeDeposit {
                deposit: date("2024-06-02"),
                maturity: date("2024-06-01"),
            })
        );
    }

    #[test]
    fn test_rejects_bad_scalars() {
        let base = terms(dec!(1000), dec!(5), dec!(20), "2024-01-01", "2025-01-01");

        let t = Terms { principal: Decimal::ZERO, ..base };
        assert_eq!(compute(&t), Err(CalcError::NonPositivePrincipal(Decimal::ZERO)));

        let t = Terms { annual_rate: dec!(-1), ..base };
        assert_eq!(compute(&t), Err(CalcError::NegativeRate(dec!(-1))));

        let t = Terms { tax_rate: dec!(100.5), ..base };
        assert_eq!(compute(&t), Err(CalcError::TaxRateOutOfRange(dec!(100.5))));
    }

    #[test]
    fn test_rejects_amounts_beyond_limits() {
        let base = terms(dec!(1000), dec!(5), dec!(20), "2024-01-01", "2025-01-01");

        let huge = Decimal::MAX;
        let t = Terms { principal: huge, ..base };
        assert_eq!(
            compute(&t),
            Err(CalcError::PrincipalTooLarge { got: huge, max: MAX_PRINCIPAL })
        );

        let t = Terms { annual_rate: dec!(1000.01), ..base };
        assert_eq!(
            compute(&t),
            Err(CalcError::RateTooLarge { got: dec!(1000.01), max: MAX_RATE })
        );
    }

    #[test]
    fn test_largest_accepted_terms_still_compute() {
        let t = Terms {
            principal: MAX_PRINCIPAL,
            annual_rate: MAX_RATE,
            tax_rate: dec!(0),
            deposit_date: NaiveDate::MIN,
            maturity_date: NaiveDate::MAX,
        };
        let f = compute(&t).unwrap();
        assert!(f.interest_before_tax > MAX_PRINCIPAL);
        assert_eq!(f.maturity_total, MAX_PRINCIPAL + f.interest_after_tax);
    }

    #[test]
    fn test_overflowing_product_is_an_error() {
        assert_eq!(mul(Decimal::MAX, dec!(2)), Err(CalcError::Overflow));
        assert_eq!(mul(dec!(1.5), dec!(2)), Ok(dec!(3)));
    }

    #[test]
    fn test_totals_hold_across_inputs() {
        let principals = [dec!(1), dec!(999.99), dec!(150000), dec!(73456789.12)];
        let rates = [dec!(0), dec!(0.75), dec!(3.1), dec!(6), dec!(12.5)];
        let taxes = [dec!(0), dec!(10), dec!(20), dec!(35.5), dec!(100)];
        let ends = ["2024-01-01", "2024-01-02", "2024-02-29", "2024-12-31", "2027-08-15"];

        for p in principals {
            for r in rates {
                for tax in taxes {
                    for end in ends {
                        let f = compute(&terms(p, r, tax, "2024-01-01", end)).unwrap();
                        assert_eq!(f.maturity_total, p + f.interest_after_tax);
                        assert_eq!(f.interest_after_tax, f.interest_before_tax - f.tax_amount);

                        // only the tax amount is rounded between the two sides
                        let exact = f.interest_before_tax * (HUNDRED - tax) / HUNDRED;
                        assert!((f.interest_after_tax - exact).abs() <= dec!(0.005));
                    }
                }
            }
        }
    }

    #[test]
    fn test_is_matured() {
        assert!(!is_matured(date("2025-01-01"), date("2024-12-31")));
        assert!(is_matured(date("2025-01-01"), date("2025-01-01")));
        assert!(is_matured(date("2025-01-01"), date("2025-06-01")));
    }
}
