use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::DepositView;
use crate::calculation::CalcError;

/// Totals over a user's deposits, as shown on the summary page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_deposits: usize,
    pub total_principal: Decimal,
    pub total_interest_before_tax: Decimal,
    pub total_interest_after_tax: Decimal,
    pub total_tax_paid: Decimal,
    pub total_maturity_amount: Decimal,
    pub average_interest_rate: Decimal,
    pub matured_deposits: usize,
    pub active_deposits: usize,
}

impl Summary {
    pub fn from_views(views: &[DepositView]) -> Result<Self, CalcError> {
        if views.is_empty() {
            return Ok(Summary::default());
        }

        let mut s = Summary {
            total_deposits: views.len(),
            ..Default::default()
        };
        let mut rate_sum = Decimal::ZERO;

        for v in views {
            add(&mut s.total_principal, v.deposit.principal_amount)?;
            add(&mut s.total_interest_before_tax, v.figures.interest_before_tax)?;
            add(&mut s.total_interest_after_tax, v.figures.interest_after_tax)?;
            add(&mut s.total_tax_paid, v.figures.tax_amount)?;
            add(&mut s.total_maturity_amount, v.figures.maturity_total)?;
            add(&mut rate_sum, v.deposit.interest_rate)?;
            if v.is_matured {
                s.matured_deposits += 1;
            } else {
                s.active_deposits += 1;
            }
        }

        s.average_interest_rate = (rate_sum / Decimal::from(views.len()))
            .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
        Ok(s)
    }
}

fn add(total: &mut Decimal, amount: Decimal) -> Result<(), CalcError> {
    *total = total.checked_add(amount).ok_or(CalcError::Overflow)?;
    Ok(())
}
