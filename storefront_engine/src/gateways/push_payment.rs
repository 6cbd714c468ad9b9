use std::{fmt::Debug, time::Duration};

use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    db_types::{NewPayment, Order, PaymentMethod},
    gateways::{
        phone::{normalise_phone, DEFAULT_COUNTRY_CODE},
        CallbackParseError,
        InitiationFailed,
        PaymentGateway,
        PendingPayment,
    },
    traits::{with_timeout, CallbackEvent, PaymentManagement, PushPaymentClient, PushPaymentRequest},
};

const RESULT_CODE_SUCCESS: i64 = 0;
const RECEIPT_ITEM_NAME: &str = "MpesaReceiptNumber";

#[derive(Debug, Clone)]
pub struct PushGatewayConfig {
    pub country_code: String,
    pub timeout: Duration,
    /// Shown on the payer's handset
    pub description: String,
}

impl Default for PushGatewayConfig {
    fn default() -> Self {
        Self {
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            timeout: Duration::from_secs(30),
            description: "Order payment".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPaymentParams {
    pub phone_number: String,
    /// Fail any attempt still waiting on the payer and start a new one
    #[serde(default)]
    pub supersede: bool,
}

/// Mobile-money push payments. The payer receives a prompt on their handset, and the provider reports the result to
/// the callback endpoint some time later.
#[derive(Clone)]
pub struct PushPaymentGateway<B, C> {
    db: B,
    client: C,
    config: PushGatewayConfig,
}

impl<B, C> Debug for PushPaymentGateway<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PushPaymentGateway({:?})", self.config)
    }
}

impl<B, C> PushPaymentGateway<B, C> {
    pub fn new(db: B, client: C, config: PushGatewayConfig) -> Self {
        Self { db, client, config }
    }

    pub fn config(&self) -> &PushGatewayConfig {
        &self.config
    }
}

impl<B, C> PaymentGateway for PushPaymentGateway<B, C>
where
    B: PaymentManagement,
    C: PushPaymentClient,
{
    type Params = PushPaymentParams;

    fn method(&self) -> PaymentMethod {
        PaymentMethod::Push
    }

    async fn initiate(&self, order: &Order, params: Self::Params) -> Result<PendingPayment, InitiationFailed> {
        let phone = normalise_phone(&params.phone_number, &self.config.country_code)
            .map_err(|e| InitiationFailed::InvalidParameters(e.to_string()))?;
        // The provider only takes whole units. A fractional total is rounded up, so the payer is charged up to 0.99
        // more than the order total. The payment row keeps the exact total.
        let amount = order.total_amount.whole_units_ceil();
        if amount <= 0 {
            return Err(InitiationFailed::InvalidParameters(format!(
                "Order {} has nothing to pay",
                order.order_number
            )));
        }
        let new_payment = NewPayment::for_order(order, PaymentMethod::Push).with_payer_reference(phone.as_str());
        let payment = self.db.begin_payment_attempt(new_payment, params.supersede).await?;
        debug!("💳️ Payment {} recorded for order {}. Prompting {phone}", payment.payment_id, order.order_number);
        let request = PushPaymentRequest {
            phone_number: phone,
            amount,
            account_reference: order.order_number.to_string(),
            description: self.config.description.clone(),
        };
        let result = with_timeout(self.config.timeout, self.client.request_payment(request)).await.into_result();
        match result {
            Ok(accepted) => {
                let payment =
                    self.db.attach_correlation_id(&payment.payment_id, &accepted.correlation_id, accepted.raw).await?;
                info!(
                    "💳️ Push payment {} for order {} accepted by the provider as {}",
                    payment.payment_id, order.order_number, accepted.correlation_id
                );
                Ok(PendingPayment { payment, redirect_url: None, customer_message: accepted.customer_message })
            },
            Err(failure) => {
                warn!("💳️ Push payment {} for order {} failed: {failure}", payment.payment_id, order.order_number);
                self.db.fail_payment_attempt(&payment.payment_id, &failure.to_string(), None).await?;
                Err(InitiationFailed::Gateway(failure))
            },
        }
    }

    fn translate_callback(&self, raw: &[u8]) -> Result<CallbackEvent, CallbackParseError> {
        parse_push_callback(raw)
    }
}

/// Reads an STK push result notification:
///
/// ```json
/// { "Body": { "stkCallback": {
///     "CheckoutRequestID": "ws_CO_...", "ResultCode": 0, "ResultDesc": "...",
///     "CallbackMetadata": { "Item": [ { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" }, ... ] } } } }
/// ```
pub fn parse_push_callback(raw: &[u8]) -> Result<CallbackEvent, CallbackParseError> {
    let payload: Value = serde_json::from_slice(raw)?;
    let callback = payload
        .pointer("/Body/stkCallback")
        .ok_or_else(|| CallbackParseError("Body.stkCallback is missing".to_string()))?;
    let correlation_id = callback
        .get("CheckoutRequestID")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CallbackParseError("CheckoutRequestID is missing".to_string()))?
        .to_string();
    let result_code = match callback.get("ResultCode") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| CallbackParseError("ResultCode is missing or not a number".to_string()))?;
    let description = callback.get("ResultDesc").and_then(Value::as_str).unwrap_or_default().to_string();
    if result_code == RESULT_CODE_SUCCESS {
        let receipt = callback
            .pointer("/CallbackMetadata/Item")
            .and_then(Value::as_array)
            .and_then(|items| {
                items.iter().find(|item| item.get("Name").and_then(Value::as_str) == Some(RECEIPT_ITEM_NAME))
            })
            .and_then(|item| item.get("Value"))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            });
        Ok(CallbackEvent::succeeded(correlation_id, receipt, payload))
    } else {
        let reason =
            if description.is_empty() { format!("Provider result code {result_code}") } else { description };
        Ok(CallbackEvent::failed(correlation_id, reason, payload))
    }
}
