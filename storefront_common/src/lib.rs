mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use helpers::parse_boolean_flag;
pub use money::{Money, MoneyConversionError, DEFAULT_HOME_CURRENCY, DEFAULT_SETTLEMENT_CURRENCY, MINOR_UNITS_PER_MAJOR};
pub use secret::Secret;
