use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::MpesaConfig,
    data_objects::{AccessToken, StkPushPayload, StkPushResponse},
    helpers::{stk_password, stk_timestamp},
    GatewayApiError,
};

pub const STK_TRANSACTION_TYPE: &str = "CustomerPayBillOnline";

#[derive(Clone)]
pub struct MpesaApi {
    config: MpesaConfig,
    client: Arc<Client>,
}

impl MpesaApi {
    pub fn new(config: MpesaConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &MpesaConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url())
    }

    /// Fetches a fresh OAuth token using the consumer key and secret.
    pub async fn access_token(&self) -> Result<String, GatewayApiError> {
        let url = self.url("/oauth/v1/generate");
        trace!("💳️ Requesting an STK push access token");
        let response = self
            .client
            .get(url)
            .query(&[("grant_type", "client_credentials")])
            .basic_auth(self.config.consumer_key.reveal(), Some(self.config.consumer_secret.reveal()))
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

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("💳️ Sending STK push query: {url}");
        let mut req = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(GatewayApiError::from_transport)?;
        if response.status().is_success() {
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(GatewayApiError::from_transport)?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    /// Builds the signed STK push request body for the given moment.
    pub fn stk_payload(
        &self,
        phone_number: &str,
        amount: i64,
        account_reference: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> StkPushPayload {
        let timestamp = stk_timestamp(now);
        let password = stk_password(&self.config.shortcode, self.config.passkey.reveal(), &timestamp);
        StkPushPayload {
            business_short_code: self.config.shortcode.clone(),
            password,
            timestamp,
            transaction_type: STK_TRANSACTION_TYPE.to_string(),
            amount,
            party_a: phone_number.to_string(),
            party_b: self.config.shortcode.clone(),
            phone_number: phone_number.to_string(),
            callback_url: self.config.callback_url.clone(),
            account_reference: account_reference.to_string(),
            transaction_desc: description.to_string(),
        }
    }

    /// Asks the provider to prompt `phone_number` for `amount` whole units. An `Ok` result only means the prompt was
    /// sent; the outcome arrives on the callback URL and is keyed by `checkout_request_id`.
    pub async fn stk_push(
        &self,
        phone_number: &str,
        amount: i64,
        account_reference: &str,
        description: &str,
    ) -> Result<StkPushResponse, GatewayApiError> {
        let token = self.access_token().await?;
        let payload = self.stk_payload(phone_number, amount, account_reference, description, Utc::now());
        debug!("💳️ Sending STK push for {account_reference}: {amount} to {phone_number}");
        let response = self
            .rest_query::<StkPushResponse, _>(Method::POST, "/mpesa/stkpush/v1/processrequest", &token, Some(payload))
            .await?;
        if response.is_accepted() {
            info!("💳️ STK push for {account_reference} accepted as {}", response.checkout_request_id);
            Ok(response)
        } else {
            warn!("💳️ STK push for {account_reference} declined: {}", response.response_description);
            Err(GatewayApiError::Declined(response.response_description))
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use storefront_common::Secret;

    use super::*;
    use crate::ProviderEnvironment;

    fn api() -> MpesaApi {
        let config = MpesaConfig {
            environment: ProviderEnvironment::Sandbox,
            consumer_key: Secret::new("key".into()),
            consumer_secret: Secret::new("secret".into()),
            shortcode: "174379".into(),
            passkey: Secret::new("pk".into()),
            callback_url: "https://shop.example/callbacks/push".into(),
        };
        MpesaApi::new(config).unwrap()
    }

    #[test]
    fn stk_payload_is_signed_for_the_shortcode() {
        let api = api();
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let payload = api.stk_payload("254712345678", 3500, "ORD-20241231-AB12CD", "Order payment", now);
        assert_eq!(payload.timestamp, "20241231235959");
        assert_eq!(payload.password, stk_password("174379", "pk", "20241231235959"));
        assert_eq!(payload.transaction_type, STK_TRANSACTION_TYPE);
        assert_eq!(payload.party_a, "254712345678");
        assert_eq!(payload.phone_number, "254712345678");
        assert_eq!(payload.party_b, "174379");
        assert_eq!(payload.business_short_code, "174379");
        assert_eq!(payload.amount, 3500);
        assert_eq!(payload.account_reference, "ORD-20241231-AB12CD");
    }

    #[test]
    fn urls() {
        assert_eq!(api().url("/oauth/v1/generate"), "https://sandbox.safaricom.co.ke/oauth/v1/generate");
    }
}
