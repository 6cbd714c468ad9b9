//! Storefront Engine
//!
//! The storefront engine turns a customer's cart into an order, takes payment for it through an external payment
//! provider, and keeps orders, stock and payments consistent when providers report back late, twice, or not at all.
//!
//! The library is divided into these sections:
//! 1. The ledger ([`mod@traits`] and, for the SQLite backend, `SqliteDatabase`). Backends implement the traits in
//!    [`mod@traits`]; the rest of the engine only ever talks to those traits. The data types stored in the ledger live
//!    in [`mod@db_types`].
//! 2. The public API ([`mod@api`]): committing orders, moving them through their lifecycle, reconciling provider
//!    callbacks, and the thin cart, delivery and exchange-rate services around them.
//! 3. Payment gateway adapters ([`mod@gateways`]). These start payments with a provider and translate its
//!    notifications. They are written against client traits, so the concrete HTTP clients live elsewhere.
//!
//! The engine also emits events when orders are created, paid, cancelled or move through fulfilment, and when
//! reconciliation finds something that needs a human. See [`mod@events`] for how to hook into them.
pub mod api;
pub mod db_types;
pub mod events;
pub mod gateways;
pub mod helpers;
pub mod lifecycle;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    cart_api::CartApi,
    errors::{CommitRejection, OrderFlowError, OrderQueryError},
    exchange_rate_api::ExchangeRateApi,
    inventory_api::InventoryApi,
    order_flow_api::OrderFlowApi,
    order_query_api::OrderQueryApi,
    reconciliation_api::ReconciliationApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db::db_url, SqliteDatabase};
pub use traits::{
    CartManagement,
    DeliveryPricing,
    ExchangeRates,
    InventoryManagement,
    OrderManagement,
    PaymentManagement,
};
