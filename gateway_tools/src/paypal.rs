use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde_json::{json, Value};
use storefront_common::Money;

use crate::{
    config::PaypalConfig,
    data_objects::{AccessToken, PaypalPayment},
    helpers::format_decimal_amount,
    GatewayApiError,
};

#[derive(Clone)]
pub struct PaypalApi {
    config: PaypalConfig,
    client: Arc<Client>,
}

/// What the storefront asks the REST payments API to charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetails<'a> {
    pub amount: Money,
    pub currency: &'a str,
    pub reference: &'a str,
    pub description: &'a str,
    pub return_url: &'a str,
    pub cancel_url: &'a str,
}

impl PaypalApi {
    pub fn new(config: PaypalConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url())
    }

    pub async fn access_token(&self) -> Result<String, GatewayApiError> {
        trace!("💳️ Requesting a REST payments access token");
        let response = self
            .client
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(self.config.client_id.reveal(), Some(self.config.client_secret.reveal()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(GatewayApiError::from_transport)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayApiError::Authentication(format!("Error {status}. {message}")));
        }
        let token = response.json::<AccessToken>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))?;
        Ok(token.access_token)
    }

    async fn rest_query(&self, method: Method, path: &str, body: Value) -> Result<PaypalPayment, GatewayApiError> {
        let token = self.access_token().await?;
        let url = self.url(path);
        trace!("💳️ Sending REST payments query: {url}");
        let response = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(GatewayApiError::from_transport)?;
        if response.status().is_success() {
            let raw = response.json::<Value>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))?;
            PaypalPayment::from_value(raw).map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(GatewayApiError::from_transport)?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    /// The request body for a single-item `sale` payment paid from a PayPal account.
    pub fn payment_body(details: &PaymentDetails<'_>) -> Result<Value, GatewayApiError> {
        let total = format_decimal_amount(details.amount)?;
        Ok(json!({
            "intent": "sale",
            "payer": { "payment_method": "paypal" },
            "redirect_urls": {
                "return_url": details.return_url,
                "cancel_url": details.cancel_url,
            },
            "transactions": [{
                "item_list": {
                    "items": [{
                        "name": format!("Order {}", details.reference),
                        "sku": details.reference,
                        "price": total,
                        "currency": details.currency,
                        "quantity": 1,
                    }]
                },
                "amount": { "total": total, "currency": details.currency },
                "description": details.description,
                "invoice_number": details.reference,
            }]
        }))
    }

    /// Creates the payment. The payer must visit the returned approval link before it can be executed.
    pub async fn create_payment(&self, details: &PaymentDetails<'_>) -> Result<PaypalPayment, GatewayApiError> {
        let body = Self::payment_body(details)?;
        debug!("💳️ Creating a {} {} payment for {}", details.amount, details.currency, details.reference);
        let payment = self.rest_query(Method::POST, "/v1/payments/payment", body).await?;
        if payment.approval_url().is_none() {
            return Err(GatewayApiError::RestResponseError(format!("Payment {} has no approval link", payment.id)));
        }
        info!("💳️ Created payment {} for {}", payment.id, details.reference);
        Ok(payment)
    }

    /// Captures an approved payment. The returned state is `approved` when the funds were taken.
    pub async fn execute_payment(&self, payment_id: &str, payer_id: &str) -> Result<PaypalPayment, GatewayApiError> {
        let path = format!("/v1/payments/payment/{payment_id}/execute");
        debug!("💳️ Executing payment {payment_id}");
        let payment = self.rest_query(Method::POST, &path, json!({ "payer_id": payer_id })).await?;
        info!("💳️ Payment {payment_id} executed. State: {}", payment.state);
        Ok(payment)
    }
}
