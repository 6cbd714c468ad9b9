//! The seams between the payment adapters and the providers' HTTP APIs.
//!
//! Provider calls never raise: every outcome, including a timeout, is a [`GatewayCallResult`] variant that the
//! adapters must handle.
use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db_types::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayCallResult<T> {
    Success(T),
    /// The provider understood the request and refused it
    Rejected(String),
    /// No answer within the configured bound
    Timeout,
    /// Network failure, unexpected status or unreadable response
    Transport(String),
}

impl<T> GatewayCallResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> Result<T, GatewayFailure> {
        match self {
            Self::Success(v) => Ok(v),
            Self::Rejected(r) => Err(GatewayFailure::Rejected(r)),
            Self::Timeout => Err(GatewayFailure::Timeout),
            Self::Transport(r) => Err(GatewayFailure::Transport(r)),
        }
    }
}

/// Every way a provider call can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayFailure {
    #[error("the payment provider rejected the request: {0}")]
    Rejected(String),
    #[error("the payment provider did not respond in time")]
    Timeout,
    #[error("could not reach the payment provider: {0}")]
    Transport(String),
}

/// Runs a provider call with an upper bound on how long it may take
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> GatewayCallResult<T>
where F: Future<Output = GatewayCallResult<T>> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => GatewayCallResult::Timeout,
    }
}

//--------------------------------------    Push payments      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPaymentRequest {
    /// Canonical international form, digits only, e.g. `254712345678`
    pub phone_number: String,
    /// Whole currency units
    pub amount: i64,
    pub account_reference: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPaymentAccepted {
    pub correlation_id: String,
    pub customer_message: Option<String>,
    pub raw: Value,
}

/// A mobile-money provider that prompts the payer on their handset and reports back asynchronously.
#[allow(async_fn_in_trait)]
pub trait PushPaymentClient {
    async fn request_payment(&self, request: PushPaymentRequest) -> GatewayCallResult<PushPaymentAccepted>;
}

//--------------------------------------  Redirect payments    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    /// Minor units of `currency`
    pub amount: Money,
    pub currency: String,
    pub reference: String,
    pub description: String,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub intent_id: String,
    /// Where to send the payer to approve the payment
    pub approval_url: String,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedIntent {
    pub intent_id: String,
    /// The provider's state for the intent; `approved` means the funds were captured
    pub state: String,
    pub receipt: Option<String>,
    pub raw: Value,
}

/// A hosted-checkout provider: create an intent, send the payer away, execute the intent when they come back.
#[allow(async_fn_in_trait)]
pub trait RedirectPaymentClient {
    async fn create_intent(&self, request: PaymentIntentRequest) -> GatewayCallResult<PaymentIntent>;

    async fn execute_intent(&self, intent_id: &str, payer_id: &str) -> GatewayCallResult<ExecutedIntent>;
}
