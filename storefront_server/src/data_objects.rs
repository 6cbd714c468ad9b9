use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_engine::{
    api::{
        exchange_objects::{ExchangeRate, RATE_SCALE},
        order_objects::PaymentSummary,
    },
    db_types::{DeliveryRequest, OrderStatusType},
    gateways::PendingPayment,
    traits::{data_objects::DEFAULT_PAGE_SIZE, Pagination},
};

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

//--------------------------------------        Carts          ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCartItemRequest {
    pub variant_id: i64,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i64,
}

//--------------------------------------       Checkout        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub delivery: DeliveryRequest,
    #[serde(default)]
    pub customer_notes: Option<String>,
}

//--------------------------------------        Orders         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<PageQuery> for Pagination {
    fn from(q: PageQuery) -> Self {
        Pagination {
            page: q.page.unwrap_or(1).max(1),
            per_page: q.per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatusType,
    #[serde(default)]
    pub note: Option<String>,
}

//--------------------------------------       Payments        ---------------------------------------------------------
/// Query parameters the hosted-checkout provider appends to the return URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectReturnParams {
    #[serde(rename = "paymentId")]
    pub payment_id: String,
    #[serde(rename = "PayerID")]
    pub payer_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedirectCancelParams {
    #[serde(rename = "paymentId", default)]
    pub payment_id: Option<String>,
}

/// A payment that the provider accepted. The raw provider response stays on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStarted {
    pub payment: PaymentSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_message: Option<String>,
}

impl From<PendingPayment> for PaymentStarted {
    fn from(p: PendingPayment) -> Self {
        Self { payment: p.payment.into(), redirect_url: p.redirect_url, customer_message: p.customer_message }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushCallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl PushCallbackAck {
    pub fn accepted() -> Self {
        Self { result_code: 0, result_desc: "Accepted".to_string() }
    }
}

//--------------------------------------    Exchange rates     ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateUpdate {
    pub base_currency: String,
    pub quote_currency: String,
    /// Decimal, e.g. "0.0078"
    pub rate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateResult {
    pub base_currency: String,
    pub quote_currency: String,
    pub rate: String,
    pub updated_at: DateTime<Utc>,
}

impl From<ExchangeRate> for ExchangeRateResult {
    fn from(r: ExchangeRate) -> Self {
        let rate = format!("{}.{:06}", r.rate / RATE_SCALE, r.rate % RATE_SCALE);
        Self { base_currency: r.base_currency, quote_currency: r.quote_currency, rate, updated_at: r.updated_at }
    }
}

//--------------------------------------      Inventory        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockUpdate {
    pub quantity: i64,
}
