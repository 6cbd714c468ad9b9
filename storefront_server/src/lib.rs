//! # Storefront server
//! This crate hosts the HTTP surface of the storefront. It is responsible for:
//! * Carts, checkout and the customer's view of their orders.
//! * Starting payments with the mobile-money push provider and the hosted-checkout provider, and completing them when
//!   the customer returns or the provider calls back.
//! * Staff and admin operations: fulfilment, cancellation, stock levels and exchange rates.
//! * Cancelling orders that were never paid, via the expiry worker.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Identity
//! Authentication happens upstream. The server trusts the `X-Storefront-User`, `X-Storefront-Session` and
//! `X-Storefront-Roles` headers; see [identity](identity/index.html).
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: Customer, staff and admin routes. See [routes](routes/index.html).
//! * `/callbacks/push`: Result notifications from the push payment provider.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod identity;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
