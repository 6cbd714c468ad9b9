use chrono::{DateTime, Utc};
use storefront_common::{Money, MINOR_UNITS_PER_MAJOR};

use crate::GatewayApiError;

/// The REST payments API takes amounts as decimal strings with two places.
pub fn format_decimal_amount(amount: Money) -> Result<String, GatewayApiError> {
    if amount.is_negative() {
        return Err(GatewayApiError::InvalidCurrencyAmount(format!("{amount} is negative")));
    }
    Ok(amount.to_string())
}

/// Parses a decimal string such as `"27.30"` or `"5"` into minor units.
pub fn parse_decimal_amount(amount: &str) -> Result<Money, GatewayApiError> {
    let invalid = |reason: &str| GatewayApiError::InvalidCurrencyAmount(format!("Invalid amount: {amount}. {reason}."));
    let mut parts = amount.trim().split('.');
    let whole = parts.next().unwrap_or_default().parse::<i64>().map_err(|e| invalid(&e.to_string()))?;
    let cents = match parts.next() {
        None => 0,
        Some(c) if c.len() == 1 => c.parse::<i64>().map_err(|e| invalid(&e.to_string()))? * 10,
        Some(c) if c.len() == 2 => c.parse::<i64>().map_err(|e| invalid(&e.to_string()))?,
        Some(_) => return Err(invalid("Too many decimal places")),
    };
    if parts.next().is_some() || whole < 0 || cents < 0 {
        return Err(invalid("Not a positive decimal number"));
    }
    Ok(Money::from(whole * MINOR_UNITS_PER_MAJOR + cents))
}

/// `YYYYMMDDHHMMSS`, the timestamp format the STK push API signs
pub fn stk_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// The STK push password is base64(shortcode + passkey + timestamp).
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    base64::encode(format!("{shortcode}{passkey}{timestamp}"))
}
