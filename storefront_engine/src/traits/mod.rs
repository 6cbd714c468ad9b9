//! # Backend contracts
//!
//! This module defines the behaviour that a storage backend must provide to run the storefront engine. The APIs in
//! [`crate::api`] are generic over these traits, so a backend only has to implement what the APIs it is used with
//! need.
//!
//! * [`OrderManagement`] is the order ledger: checkout commits, payment outcomes and fulfilment steps.
//! * [`PaymentManagement`] is the payments ledger and the reconciliation of provider callbacks.
//! * [`CartManagement`] holds shopping carts until checkout.
//! * [`DeliveryPricing`] knows the delivery options and their fees.
//! * [`InventoryManagement`] administers catalogue stock.
//! * [`ExchangeRates`] stores the rates used to charge in a provider's settlement currency.
//!
//! [`PushPaymentClient`] and [`RedirectPaymentClient`] are not storage contracts. They are the seams to the payment
//! providers, implemented by whoever wires the engine to real HTTP clients.
mod cart_management;
mod delivery_pricing;
mod exchange_rates;
mod gateway_clients;
mod inventory_management;
mod order_management;
mod payment_management;

pub mod data_objects;

pub use cart_management::{CartError, CartManagement};
pub use data_objects::{
    CallbackEvent,
    CallbackOutcome,
    CartItemDetail,
    ExpiryResult,
    OrderPage,
    OutcomeApplied,
    Pagination,
    ReconcileOutcome,
};
pub use delivery_pricing::{resolve_for_station, resolve_for_zone, DeliveryError, DeliveryPricing};
pub use exchange_rates::{ExchangeRateError, ExchangeRates};
pub use gateway_clients::{
    with_timeout,
    ExecutedIntent,
    GatewayCallResult,
    GatewayFailure,
    PaymentIntent,
    PaymentIntentRequest,
    PushPaymentAccepted,
    PushPaymentClient,
    PushPaymentRequest,
    RedirectPaymentClient,
};
pub use inventory_management::{InventoryError, InventoryManagement};
pub use order_management::{OrderManagement, OrderManagementError};
pub use payment_management::{PaymentManagement, PaymentManagementError};
