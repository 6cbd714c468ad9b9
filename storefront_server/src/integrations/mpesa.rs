use gateway_tools::MpesaApi;
use log::*;
use storefront_engine::traits::{GatewayCallResult, PushPaymentAccepted, PushPaymentClient, PushPaymentRequest};

use super::classify;

/// Daraja STK push behind the engine's push payment seam
#[derive(Clone)]
pub struct MpesaGateway(MpesaApi);

impl MpesaGateway {
    pub fn new(api: MpesaApi) -> Self {
        Self(api)
    }
}

impl PushPaymentClient for MpesaGateway {
    async fn request_payment(&self, request: PushPaymentRequest) -> GatewayCallResult<PushPaymentAccepted> {
        let PushPaymentRequest { phone_number, amount, account_reference, description } = request;
        match self.0.stk_push(&phone_number, amount, &account_reference, &description).await {
            Ok(response) => {
                let raw = serde_json::to_value(&response).unwrap_or_else(|e| {
                    warn!("💳️ Could not store the STK push response for {account_reference}. {e}");
                    serde_json::Value::Null
                });
                GatewayCallResult::Success(PushPaymentAccepted {
                    correlation_id: response.checkout_request_id,
                    customer_message: response.customer_message,
                    raw,
                })
            },
            Err(e) => classify("M-Pesa", e),
        }
    }
}
