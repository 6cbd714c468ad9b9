//! # Gateway tools
//!
//! Thin REST clients for the two external payment providers the storefront talks to:
//!
//! * [`MpesaApi`] drives a Daraja-style STK push: fetch an OAuth token, then ask the provider to prompt the payer's
//!   handset. The outcome arrives later on the callback URL.
//! * [`PaypalApi`] drives a REST payments flow: create a `sale` payment, send the payer to the approval link, then
//!   execute the payment with the payer id the provider hands back.
//!
//! Neither client knows anything about orders or the ledger. The server adapts them to the engine's client traits.
mod config;
mod error;
mod mpesa;
mod paypal;

pub mod data_objects;
pub mod helpers;

pub use config::{MpesaConfig, PaypalConfig, ProviderEnvironment};
pub use error::GatewayApiError;
pub use mpesa::MpesaApi;
pub use paypal::{PaymentDetails, PaypalApi};
