use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Seconds. The mobile-money API sends this as a string, the REST payments API as a number.
    #[serde(default)]
    pub expires_in: Value,
}

//--------------------------------------     STK push          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushPayload {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: String,
    /// Whole currency units
    pub amount: i64,
    /// The paying phone number
    pub party_a: String,
    /// The receiving shortcode
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID", default)]
    pub checkout_request_id: String,
    #[serde(default)]
    pub response_code: String,
    #[serde(default)]
    pub response_description: String,
    #[serde(default)]
    pub customer_message: Option<String>,
}

impl StkPushResponse {
    pub fn is_accepted(&self) -> bool {
        self.response_code == "0" && !self.checkout_request_id.is_empty()
    }
}

//--------------------------------------   REST payments       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaypalItem {
    pub name: String,
    pub sku: String,
    pub price: String,
    pub currency: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaypalAmount {
    pub total: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaypalLink {
    pub href: String,
    pub rel: String,
    #[serde(default)]
    pub method: Option<String>,
}

/// A payment as the REST payments API reports it after create or execute. Only the fields the storefront reads are
/// typed; the full body is kept in `raw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaypalPayment {
    pub id: String,
    pub state: String,
    #[serde(default)]
    pub links: Vec<PaypalLink>,
    #[serde(skip)]
    pub raw: Value,
}

impl PaypalPayment {
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let mut payment = serde_json::from_value::<Self>(raw.clone())?;
        payment.raw = raw;
        Ok(payment)
    }

    pub fn approval_url(&self) -> Option<&str> {
        self.links.iter().find(|l| l.rel == "approval_url").map(|l| l.href.as_str())
    }

    /// The id of the captured sale, present once an approved payment has been executed
    pub fn sale_id(&self) -> Option<String> {
        self.raw["transactions"]
            .as_array()?
            .iter()
            .filter_map(|t| t["related_resources"].as_array())
            .flatten()
            .find_map(|r| r["sale"]["id"].as_str())
            .map(String::from)
    }
}
