//! Phone numbers for mobile-money prompts.
//!
//! Providers want the international form without a `+`, e.g. `254712345678`. Customers type numbers every other way.
use thiserror::Error;

pub const DEFAULT_COUNTRY_CODE: &str = "254";
/// Digits in a subscriber number once the trunk prefix or country code is removed
const SUBSCRIBER_DIGITS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognised phone number: {0}")]
pub struct InvalidPhoneNumber(pub String);

/// Converts a phone number to the canonical `<country code><9 digits>` form.
///
/// Spaces, dashes and a leading `+` are dropped. Then:
/// * `0712345678` (local trunk prefix) becomes `254712345678`
/// * `254712345678` is kept as is
/// * `712345678` (bare subscriber number starting with 7 or 1) becomes `254712345678`
///
/// Anything else is rejected.
pub fn normalise_phone(input: &str, country_code: &str) -> Result<String, InvalidPhoneNumber> {
    let invalid = || InvalidPhoneNumber(input.to_string());
    let cleaned = input.chars().filter(|c| !c.is_whitespace() && *c != '-').collect::<String>();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let subscriber = if let Some(rest) = digits.strip_prefix('0').filter(|r| r.len() == SUBSCRIBER_DIGITS) {
        rest
    } else if let Some(rest) = digits.strip_prefix(country_code).filter(|r| r.len() == SUBSCRIBER_DIGITS) {
        rest
    } else if digits.len() == SUBSCRIBER_DIGITS {
        digits
    } else {
        return Err(invalid());
    };
    if !subscriber.starts_with('7') && !subscriber.starts_with('1') {
        return Err(invalid());
    }
    Ok(format!("{country_code}{subscriber}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepted_formats() {
        for input in ["0712345678", "+254712345678", "254712345678", "712345678", "0712 345 678", "+254-712-345-678"] {
            assert_eq!(normalise_phone(input, "254").unwrap(), "254712345678", "{input}");
        }
        assert_eq!(normalise_phone("0110345678", "254").unwrap(), "254110345678");
    }

    #[test]
    fn rejected_formats() {
        for input in ["", "+", "07123", "07123456789", "0812345678", "abc0712345678", "44712345678", "255712345678"] {
            assert!(normalise_phone(input, "254").is_err(), "{input}");
        }
    }

    #[test]
    fn other_country_codes() {
        assert_eq!(normalise_phone("0712345678", "255").unwrap(), "255712345678");
        assert_eq!(normalise_phone("+255712345678", "255").unwrap(), "255712345678");
    }
}
