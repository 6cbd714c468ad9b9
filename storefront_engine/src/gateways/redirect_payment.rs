use std::{fmt::Debug, time::Duration};

use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    api::{exchange_rate_api::ExchangeRateApi, reconciliation_api::ReconciliationApi},
    db_types::{NewPayment, Order, OrderNumber, Payment, PaymentMethod, PaymentSubject},
    events::EventProducers,
    gateways::{CallbackParseError, InitiationFailed, PaymentGateway, PendingPayment},
    traits::{
        with_timeout,
        CallbackEvent,
        ExchangeRates,
        GatewayFailure,
        PaymentIntentRequest,
        PaymentManagement,
        PaymentManagementError,
        ReconcileOutcome,
        RedirectPaymentClient,
    },
};
use storefront_common::{DEFAULT_HOME_CURRENCY, DEFAULT_SETTLEMENT_CURRENCY};

pub const APPROVED_STATE: &str = "approved";
pub const USER_CANCELLED_REASON: &str = "user cancelled";

#[derive(Debug, Clone)]
pub struct RedirectGatewayConfig {
    /// The currency orders are priced in
    pub home_currency: String,
    /// The currency the provider charges in
    pub settlement_currency: String,
    /// Exchange rates older than this are refused
    pub max_rate_age: chrono::Duration,
    /// The externally visible address of this server. Return and cancel URLs are built from it.
    pub public_base_url: String,
    pub timeout: Duration,
}

impl Default for RedirectGatewayConfig {
    fn default() -> Self {
        Self {
            home_currency: DEFAULT_HOME_CURRENCY.to_string(),
            settlement_currency: DEFAULT_SETTLEMENT_CURRENCY.to_string(),
            max_rate_age: chrono::Duration::hours(24),
            public_base_url: "http://localhost:8360".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RedirectGatewayConfig {
    pub fn return_url(&self, order_number: &OrderNumber) -> String {
        format!("{}/api/payments/redirect/{order_number}/execute", self.public_base_url.trim_end_matches('/'))
    }

    pub fn cancel_url(&self, order_number: &OrderNumber) -> String {
        format!("{}/api/payments/redirect/{order_number}/cancel", self.public_base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedirectPaymentParams {
    #[serde(default)]
    pub supersede: bool,
}

#[derive(Debug, Clone, Error)]
pub enum RedirectPaymentError {
    #[error("Payment {0} does not exist")]
    PaymentNotFound(String),
    #[error("Payment {correlation_id} does not belong to order {order_number}")]
    PaymentMismatch { order_number: OrderNumber, correlation_id: String },
    #[error("The provider's answer could not be verified: {0}")]
    VerificationFailed(String),
    #[error("{0}")]
    Gateway(#[from] GatewayFailure),
    #[error("Order {0} has no payment waiting to be cancelled")]
    NothingToCancel(OrderNumber),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PaymentManagementError> for RedirectPaymentError {
    fn from(e: PaymentManagementError) -> Self {
        match e {
            PaymentManagementError::PaymentNotFound(id) => Self::PaymentNotFound(id),
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

/// Hosted-checkout payments. The customer is sent to the provider to approve the payment and comes back to the return
/// URL, where the payment is executed and reconciled.
///
/// The provider charges in the settlement currency, so the order total is converted with the latest stored exchange
/// rate. Initiation is refused if that rate is missing or too old.
pub struct RedirectPaymentGateway<B, C> {
    db: B,
    client: C,
    config: RedirectGatewayConfig,
    rates: ExchangeRateApi<B>,
    reconciliation: ReconciliationApi<B>,
}

impl<B, C> Debug for RedirectPaymentGateway<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RedirectPaymentGateway({:?})", self.config)
    }
}

impl<B, C> RedirectPaymentGateway<B, C>
where
    B: PaymentManagement + ExchangeRates + Clone,
    C: RedirectPaymentClient,
{
    pub fn new(db: B, client: C, config: RedirectGatewayConfig, producers: EventProducers) -> Self {
        let rates = ExchangeRateApi::new(db.clone());
        let reconciliation = ReconciliationApi::new(db.clone(), producers);
        Self { db, client, config, rates, reconciliation }
    }

    pub fn config(&self) -> &RedirectGatewayConfig {
        &self.config
    }

    /// Completes a payment after the customer returns from the provider.
    ///
    /// `correlation_id` is the provider's intent id and `payer_token` the payer id the provider appended to the return
    /// URL. Calling this again for a payment that is already settled returns `Replayed` without contacting the
    /// provider. If the provider cannot be reached, the payment stays `processing` and the call may be retried.
    pub async fn execute(
        &self,
        order: &Order,
        correlation_id: &str,
        payer_token: &str,
    ) -> Result<ReconcileOutcome, RedirectPaymentError> {
        let payment = self.payment_for_order(order, correlation_id).await?;
        if payment.status.is_terminal() {
            debug!("💳️ Payment {} for order {} is already {}", payment.payment_id, order.order_number, payment.status);
            return Ok(ReconcileOutcome::Replayed { payment });
        }
        let executed = with_timeout(self.config.timeout, self.client.execute_intent(correlation_id, payer_token))
            .await
            .into_result()
            .map_err(|e| {
                warn!("💳️ Could not execute payment {correlation_id} for order {}: {e}", order.order_number);
                RedirectPaymentError::Gateway(e)
            })?;
        if executed.intent_id != correlation_id {
            error!(
                "💳️ Executing payment {correlation_id} returned intent {} instead. Not settling order {}",
                executed.intent_id, order.order_number
            );
            return Err(RedirectPaymentError::VerificationFailed(format!(
                "expected intent {correlation_id}, got {}",
                executed.intent_id
            )));
        }
        if executed.state != APPROVED_STATE {
            let reason = format!("payment was not approved (state: {})", executed.state);
            warn!("💳️ Payment {} for order {}: {reason}", payment.payment_id, order.order_number);
            self.db.fail_payment_attempt(&payment.payment_id, &reason, Some(executed.raw)).await?;
            return Err(RedirectPaymentError::VerificationFailed(reason));
        }
        let event = CallbackEvent::succeeded(correlation_id, executed.receipt, executed.raw);
        let outcome = self.reconciliation.process(event).await?;
        Ok(outcome)
    }

    /// Marks the order's waiting redirect payment as failed because the customer backed out at the provider. The order
    /// stays `pending`. Cancelling a payment that has already settled returns it unchanged.
    pub async fn cancel(&self, order: &Order, correlation_id: Option<&str>) -> Result<Payment, RedirectPaymentError> {
        let payment = match correlation_id {
            Some(id) => self.payment_for_order(order, id).await?,
            None => self
                .db
                .fetch_in_flight_payment(PaymentSubject::Order(order.id), Some(PaymentMethod::Redirect))
                .await?
                .ok_or_else(|| RedirectPaymentError::NothingToCancel(order.order_number.clone()))?,
        };
        if payment.status.is_terminal() {
            debug!("💳️ Payment {} is already {}. Nothing to cancel", payment.payment_id, payment.status);
            return Ok(payment);
        }
        match self.db.fail_payment_attempt(&payment.payment_id, USER_CANCELLED_REASON, None).await {
            Ok(payment) => {
                info!("💳️ Payment {} for order {} was cancelled by the customer", payment.payment_id, order.order_number);
                Ok(payment)
            },
            Err(PaymentManagementError::PaymentAlreadyFinal(_)) => {
                let subject = PaymentSubject::Order(order.id);
                let settled = self
                    .db
                    .fetch_payments_for_subject(subject)
                    .await?
                    .into_iter()
                    .find(|p| p.payment_id == payment.payment_id)
                    .ok_or_else(|| RedirectPaymentError::PaymentNotFound(payment.payment_id.to_string()))?;
                Ok(settled)
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn payment_for_order(&self, order: &Order, correlation_id: &str) -> Result<Payment, RedirectPaymentError> {
        let payment = self
            .db
            .fetch_payment_by_correlation_id(correlation_id)
            .await?
            .ok_or_else(|| RedirectPaymentError::PaymentNotFound(correlation_id.to_string()))?;
        if payment.subject != PaymentSubject::Order(order.id) || payment.method != PaymentMethod::Redirect {
            warn!("💳️ Payment {correlation_id} was presented for order {}, but does not belong to it", order.order_number);
            return Err(RedirectPaymentError::PaymentMismatch {
                order_number: order.order_number.clone(),
                correlation_id: correlation_id.to_string(),
            });
        }
        Ok(payment)
    }
}

impl<B, C> PaymentGateway for RedirectPaymentGateway<B, C>
where
    B: PaymentManagement + ExchangeRates + Clone,
    C: RedirectPaymentClient,
{
    type Params = RedirectPaymentParams;

    fn method(&self) -> PaymentMethod {
        PaymentMethod::Redirect
    }

    async fn initiate(&self, order: &Order, params: Self::Params) -> Result<PendingPayment, InitiationFailed> {
        let home = self.config.home_currency.as_str();
        let settlement = self.config.settlement_currency.as_str();
        if order.currency != home {
            return Err(InitiationFailed::InvalidParameters(format!(
                "Order {} is priced in {}, but payments are converted from {home}",
                order.order_number, order.currency
            )));
        }
        let rate = self
            .rates
            .current_rate(home, settlement, self.config.max_rate_age)
            .await
            .map_err(|e| InitiationFailed::RateUnavailable(e.to_string()))?;
        let settlement_amount = rate.convert(order.total_amount);
        if settlement_amount.value() <= 0 {
            return Err(InitiationFailed::InvalidParameters(format!(
                "Order {} converts to {settlement_amount} {settlement}, which cannot be charged",
                order.order_number
            )));
        }
        let new_payment =
            NewPayment::for_order(order, PaymentMethod::Redirect).with_settlement(settlement_amount, settlement);
        let payment = self.db.begin_payment_attempt(new_payment, params.supersede).await?;
        debug!(
            "💳️ Payment {} recorded for order {}: {} {home} => {settlement_amount} {settlement} at {rate}",
            payment.payment_id, order.order_number, order.total_amount
        );
        let request = PaymentIntentRequest {
            amount: settlement_amount,
            currency: settlement.to_string(),
            reference: order.order_number.to_string(),
            description: format!("Order {}", order.order_number),
            return_url: self.config.return_url(&order.order_number),
            cancel_url: self.config.cancel_url(&order.order_number),
        };
        let result = with_timeout(self.config.timeout, self.client.create_intent(request)).await.into_result();
        match result {
            Ok(intent) => {
                let payment = self.db.attach_correlation_id(&payment.payment_id, &intent.intent_id, intent.raw).await?;
                info!(
                    "💳️ Redirect payment {} for order {} created as {}",
                    payment.payment_id, order.order_number, intent.intent_id
                );
                Ok(PendingPayment { payment, redirect_url: Some(intent.approval_url), customer_message: None })
            },
            Err(failure) => {
                warn!("💳️ Redirect payment {} for order {} failed: {failure}", payment.payment_id, order.order_number);
                self.db.fail_payment_attempt(&payment.payment_id, &failure.to_string(), None).await?;
                Err(InitiationFailed::Gateway(failure))
            },
        }
    }

    fn translate_callback(&self, raw: &[u8]) -> Result<CallbackEvent, CallbackParseError> {
        parse_redirect_notification(raw)
    }
}

/// Reads a payment resource as the provider reports it:
/// `{ "id": "PAY-...", "state": "approved", "transactions": [ { "related_resources": [ { "sale": { "id": ... } } ] } ] }`
///
/// Only final states can be translated. `approved` is a success with the sale id as receipt; `failed`, `canceled` and
/// `expired` are failures.
pub fn parse_redirect_notification(raw: &[u8]) -> Result<CallbackEvent, CallbackParseError> {
    let payload: Value = serde_json::from_slice(raw)?;
    let correlation_id = payload
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CallbackParseError("payment id is missing".to_string()))?
        .to_string();
    let state = payload
        .get("state")
        .and_then(Value::as_str)
        .ok_or_else(|| CallbackParseError("payment state is missing".to_string()))?
        .to_lowercase();
    match state.as_str() {
        APPROVED_STATE => {
            let receipt = sale_id(&payload);
            Ok(CallbackEvent::succeeded(correlation_id, receipt, payload))
        },
        "failed" | "canceled" | "cancelled" | "expired" => {
            let reason = payload
                .get("failure_reason")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| format!("payment {state}"));
            Ok(CallbackEvent::failed(correlation_id, reason, payload))
        },
        other => Err(CallbackParseError(format!("payment {correlation_id} is not final yet (state: {other})"))),
    }
}

/// The id of the first sale recorded against the payment
pub fn sale_id(payload: &Value) -> Option<String> {
    payload
        .get("transactions")?
        .as_array()?
        .iter()
        .filter_map(|t| t.get("related_resources").and_then(Value::as_array))
        .flatten()
        .find_map(|r| r.pointer("/sale/id").and_then(Value::as_str))
        .map(String::from)
}
