use chrono::{DateTime, Utc};
use rand::{thread_rng, Rng};
use regex::Regex;

use crate::db_types::{OrderNumber, PaymentId};

// No 0/O or 1/I, so numbers can be read out over the phone
const ORDER_SUFFIX_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ORDER_SUFFIX_LEN: usize = 6;

/// Generates a new order number of the form `ORD-YYYYMMDD-XXXXXX`. Uniqueness is enforced by the database; callers
/// retry on collision.
pub fn new_order_number(now: DateTime<Utc>) -> OrderNumber {
    let mut rng = thread_rng();
    let suffix = (0..ORDER_SUFFIX_LEN)
        .map(|_| ORDER_SUFFIX_CHARS[rng.gen_range(0..ORDER_SUFFIX_CHARS.len())] as char)
        .collect::<String>();
    OrderNumber(format!("ORD-{}-{suffix}", now.format("%Y%m%d")))
}

pub fn is_valid_order_number(s: &str) -> bool {
    Regex::new(r"^ORD-\d{8}-[A-Z0-9]{6}$").map(|re| re.is_match(s)).unwrap_or(false)
}

pub fn new_payment_id() -> PaymentId {
    PaymentId(format!("PAY-{:016X}", rand::random::<u64>()))
}
