use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

pub fn fmt_money(d: &Decimal) -> String {
    d.round_dp(2).to_string()
}

/// Amount with the currency symbol and dot thousand separators, no cents:
/// `Rp 10.480.986`.
pub fn fmt_currency(symbol: &str, d: &Decimal) -> String {
    let whole = d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = whole.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if whole.is_sign_negative() && !whole.is_zero() { "-" } else { "" };
    format!("{} {}{}", symbol, sign, grouped)
}

pub fn fmt_rate(d: &Decimal) -> String {
    format!("{}%", d.normalize())
}

/// Accepts plain decimals and tolerates thousand separators typed as
/// commas or underscores (`10,000,000`).
pub fn parse_money(s: &str) -> Option<Decimal> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str_exact(&cleaned).ok()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .ok()
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn iso(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}
