use gateway_tools::{PaymentDetails, PaypalApi};
use log::*;
use storefront_engine::traits::{
    ExecutedIntent,
    GatewayCallResult,
    PaymentIntent,
    PaymentIntentRequest,
    RedirectPaymentClient,
};

use super::classify;

/// The PayPal REST payments API behind the engine's hosted-checkout seam
#[derive(Clone)]
pub struct PaypalGateway(PaypalApi);

impl PaypalGateway {
    pub fn new(api: PaypalApi) -> Self {
        Self(api)
    }
}

impl RedirectPaymentClient for PaypalGateway {
    async fn create_intent(&self, request: PaymentIntentRequest) -> GatewayCallResult<PaymentIntent> {
        let details = PaymentDetails {
            amount: request.amount,
            currency: &request.currency,
            reference: &request.reference,
            description: &request.description,
            return_url: &request.return_url,
            cancel_url: &request.cancel_url,
        };
        match self.0.create_payment(&details).await {
            Ok(payment) => match payment.approval_url().map(str::to_string) {
                Some(approval_url) => {
                    GatewayCallResult::Success(PaymentIntent { intent_id: payment.id, approval_url, raw: payment.raw })
                },
                None => {
                    warn!("💳️ PayPal payment {} for {} has no approval link", payment.id, request.reference);
                    GatewayCallResult::Transport("the provider did not return an approval link".to_string())
                },
            },
            Err(e) => classify("PayPal", e),
        }
    }

    async fn execute_intent(&self, intent_id: &str, payer_id: &str) -> GatewayCallResult<ExecutedIntent> {
        match self.0.execute_payment(intent_id, payer_id).await {
            Ok(payment) => {
                debug!("💳️ PayPal payment {intent_id} executed with state {}", payment.state);
                let receipt = payment.sale_id();
                GatewayCallResult::Success(ExecutedIntent {
                    intent_id: payment.id,
                    state: payment.state,
                    receipt,
                    raw: payment.raw,
                })
            },
            Err(e) => classify("PayPal", e),
        }
    }
}
