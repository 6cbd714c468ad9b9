//! # Storefront engine public API
//!
//! The `api` module exposes the programmatic API of the storefront engine. Each API is generic over the backend traits
//! it needs, so clients can pick only the functionality they want.
//!
//! * [`order_flow_api`] owns the order state machine: checkout, payment outcomes, cancellation, fulfilment and the
//!   expiry sweep.
//! * [`reconciliation_api`] applies payment provider callbacks to payments and orders.
//! * [`order_query_api`] is the read-only order status surface.
//! * [`cart_api`] is the thin cart service that feeds checkout.
//! * [`exchange_rate_api`] manages the rates used to charge in a provider's settlement currency.
//! * [`inventory_api`] lets administrators correct stock levels.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits the API requires.
//!
//! ```rust,ignore
//! use storefront_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let committed = api.commit(&actor, &delivery, None).await?;
//! ```
pub mod cart_api;
pub mod errors;
pub mod exchange_objects;
pub mod exchange_rate_api;
pub mod inventory_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod order_query_api;
pub mod reconciliation_api;
