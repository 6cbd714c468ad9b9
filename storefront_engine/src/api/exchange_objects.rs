use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{db_types::Money, traits::ExchangeRateError};

/// Rates are fixed-point numbers with six decimal places
pub const RATE_SCALE: i64 = 1_000_000;

/// How many units of `quote_currency` one unit of `base_currency` buys, scaled by [`RATE_SCALE`].
///
/// Both currencies are counted in hundredths, so the rate applies to minor units unchanged.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub base_currency: String,
    pub quote_currency: String,
    pub rate: i64,
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new<S: Into<String>>(base: S, quote: S, rate: i64, updated_at: Option<DateTime<Utc>>) -> Self {
        let updated_at = updated_at.unwrap_or_else(Utc::now);
        Self { base_currency: base.into(), quote_currency: quote.into(), rate, updated_at }
    }

    /// Converts an amount in the base currency to the quote currency, rounding half up to the nearest minor unit.
    pub fn convert(&self, amount: Money) -> Money {
        let scaled = i128::from(amount.value()) * i128::from(self.rate);
        let half = i128::from(RATE_SCALE / 2);
        let rounded = if scaled >= 0 {
            (scaled + half) / i128::from(RATE_SCALE)
        } else {
            (scaled - half) / i128::from(RATE_SCALE)
        };
        Money::from(i64::try_from(rounded).unwrap_or(i64::MAX))
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.updated_at
    }

    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) > max_age
    }

    pub fn pair(&self) -> String {
        format!("{}/{}", self.base_currency, self.quote_currency)
    }
}

/// Parses a decimal rate such as `0.0078` into its fixed-point form. At most six decimal places are accepted.
pub fn parse_rate(s: &str) -> Result<i64, ExchangeRateError> {
    let invalid = || ExchangeRateError::InvalidRate(s.to_string());
    let s = s.trim();
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if frac.len() > 6 || (whole.is_empty() && frac.is_empty()) {
        return Err(invalid());
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let whole = if whole.is_empty() { 0 } else { i64::from_str(whole).map_err(|_| invalid())? };
    let frac = format!("{frac:0<6}");
    let frac = i64::from_str(&frac).map_err(|_| invalid())?;
    let rate = whole.checked_mul(RATE_SCALE).and_then(|w| w.checked_add(frac)).ok_or_else(invalid)?;
    if rate <= 0 {
        return Err(invalid());
    }
    Ok(rate)
}

impl Display for ExchangeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "1 {} => {}.{:06} {}",
            self.base_currency,
            self.rate / RATE_SCALE,
            self.rate % RATE_SCALE,
            self.quote_currency
        )
    }
}
