mod identifiers;

pub use identifiers::{is_valid_order_number, new_order_number, new_payment_id};
