//! Payment Gateway Adapter.
//!
//! Each adapter knows how to start a payment with one kind of provider and how to read that provider's notifications.
//! Adapters never talk HTTP themselves: they drive a client trait from [`crate::traits`], so the engine can be tested
//! without a network and the server decides which concrete client to plug in.
//!
//! Starting a payment always follows the same steps:
//! 1. Validate the request. Nothing is written if it is invalid.
//! 2. Record a `processing` payment attempt for the order (see [`PaymentManagement::begin_payment_attempt`]).
//! 3. Call the provider, bounded by a timeout.
//! 4. Attach the provider's correlation id on success, or mark the attempt failed otherwise. The order stays `pending`
//!    either way, so the customer can try again.
//!
//! [`PaymentManagement::begin_payment_attempt`]: crate::traits::PaymentManagement::begin_payment_attempt
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{Order, OrderNumber, OrderStatusType, Payment, PaymentId, PaymentMethod},
    traits::{CallbackEvent, GatewayFailure, PaymentManagementError},
};

pub mod phone;
mod push_payment;
mod redirect_payment;

pub use push_payment::{PushGatewayConfig, PushPaymentGateway, PushPaymentParams};
pub use redirect_payment::{RedirectGatewayConfig, RedirectPaymentError, RedirectPaymentGateway, RedirectPaymentParams};

/// A payment attempt that the provider has accepted and that now waits for the payer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPayment {
    pub payment: Payment,
    /// Where to send the customer, for providers that host the checkout page
    pub redirect_url: Option<String>,
    /// A message from the provider to show the customer, e.g. "check your phone"
    pub customer_message: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum InitiationFailed {
    #[error("Invalid payment request: {0}")]
    InvalidParameters(String),
    #[error("Order {order_number} is {status} and cannot be paid")]
    OrderNotPayable { order_number: OrderNumber, status: OrderStatusType },
    #[error("Payment {0} is still in progress for this order")]
    PaymentInProgress(PaymentId),
    #[error("No usable exchange rate: {0}")]
    RateUnavailable(String),
    #[error("{0}")]
    Gateway(#[from] GatewayFailure),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PaymentManagementError> for InitiationFailed {
    fn from(e: PaymentManagementError) -> Self {
        match e {
            PaymentManagementError::OrderNotPayable { order_number, status } => {
                Self::OrderNotPayable { order_number, status }
            },
            PaymentManagementError::PaymentInProgress(id) => Self::PaymentInProgress(id),
            PaymentManagementError::SubjectNotFound(subject) => {
                Self::InvalidParameters(format!("{subject} does not exist"))
            },
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Could not read the payment notification: {0}")]
pub struct CallbackParseError(pub String);

impl From<serde_json::Error> for CallbackParseError {
    fn from(e: serde_json::Error) -> Self {
        Self(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// What the customer supplies when starting a payment with this provider
    type Params;

    fn method(&self) -> PaymentMethod;

    /// Starts a payment for the full order total. The order must be `pending`.
    async fn initiate(&self, order: &Order, params: Self::Params) -> Result<PendingPayment, InitiationFailed>;

    /// Turns a raw provider notification into a [`CallbackEvent`] for the reconciliation processor.
    fn translate_callback(&self, raw: &[u8]) -> Result<CallbackEvent, CallbackParseError>;
}
