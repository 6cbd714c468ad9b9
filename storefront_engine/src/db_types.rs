use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, types::Json, FromRow, Row, Type};
pub use storefront_common::Money;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}")]
pub struct ConversionError(String);

//--------------------------------------     ActorContext      ---------------------------------------------------------
/// Who is acting on a cart or an order. Every cart and order operation receives one of these explicitly; there is no
/// ambient "current user".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum ActorContext {
    User(String),
    Session(String),
}

impl ActorContext {
    pub fn user<S: Into<String>>(id: S) -> Self {
        Self::User(id.into())
    }

    pub fn session<S: Into<String>>(key: S) -> Self {
        Self::Session(key.into())
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User(id) => Some(id.as_str()),
            Self::Session(_) => None,
        }
    }

    pub fn session_key(&self) -> Option<&str> {
        match self {
            Self::User(_) => None,
            Self::Session(key) => Some(key.as_str()),
        }
    }

    /// Rebuilds the owner of a record from its `user_id`/`session_key` column pair.
    pub fn from_columns(user_id: Option<&str>, session_key: Option<&str>) -> Option<Self> {
        match (user_id, session_key) {
            (Some(u), _) => Some(Self::user(u)),
            (None, Some(s)) => Some(Self::session(s)),
            (None, None) => None,
        }
    }
}

impl Display for ActorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Session(key) => write!(f, "session:{key}"),
        }
    }
}

//--------------------------------------         Role          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fulfilment staff. May view any order and advance fulfilment status.
    Staff,
    /// Store administrators. May cancel orders, manage stock and set exchange rates.
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Staff => write!(f, "staff"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            _ => Err(ConversionError(format!("role: {s}"))),
        }
    }
}

//--------------------------------------     OrderNumber       ---------------------------------------------------------
/// The public, human-facing identifier of an order, e.g. `ORD-20241017-7KQ2ZD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// Committed, stock reserved, awaiting payment.
    Pending,
    /// Payment succeeded.
    Confirmed,
    Processing,
    Shipped,
    /// Terminal
    Delivered,
    /// Terminal. Payment failed, the order was abandoned or it timed out.
    Cancelled,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 6] = [
        OrderStatusType::Pending,
        OrderStatusType::Confirmed,
        OrderStatusType::Processing,
        OrderStatusType::Shipped,
        OrderStatusType::Delivered,
        OrderStatusType::Cancelled,
    ];

    /// The path an order follows when nothing goes wrong
    pub const HAPPY_PATH: [OrderStatusType; 5] = [
        OrderStatusType::Pending,
        OrderStatusType::Confirmed,
        OrderStatusType::Processing,
        OrderStatusType::Shipped,
        OrderStatusType::Delivered,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// True once a payment has succeeded for the order
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Processing | Self::Shipped | Self::Delivered)
    }

    /// The only status a fulfilment action may move this order to, if any.
    pub fn fulfilment_successor(&self) -> Option<Self> {
        match self {
            Self::Confirmed => Some(Self::Processing),
            Self::Processing => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            _ => None,
        }
    }

    pub fn tracking_label(&self) -> &'static str {
        match self {
            Self::Pending => "Order Placed",
            Self::Confirmed => "Payment Confirmed",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.to_string() == s.to_ascii_lowercase())
            .ok_or_else(|| ConversionError(format!("order status: {s}")))
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------    ProductVariant     ---------------------------------------------------------
pub const LOW_STOCK_THRESHOLD: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub variant_details: Option<String>,
    pub price: Money,
    pub stock_quantity: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl ProductVariant {
    pub fn stock_status(&self) -> StockStatus {
        match self.stock_quantity {
            q if q <= 0 => StockStatus::OutOfStock,
            q if q <= LOW_STOCK_THRESHOLD => StockStatus::LowStock,
            _ => StockStatus::InStock,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVariant {
    pub sku: String,
    pub name: String,
    pub variant_details: Option<String>,
    pub price: Money,
    pub stock_quantity: i64,
}

impl NewVariant {
    pub fn new<S: Into<String>>(sku: S, name: S, price: Money, stock_quantity: i64) -> Self {
        Self { sku: sku.into(), name: name.into(), variant_details: None, price, stock_quantity }
    }

    /// Formats size and colour the way they appear on order lines, e.g. "Size: M, Color: Red"
    pub fn with_details(mut self, size: Option<&str>, color: Option<&str>) -> Self {
        let parts = [size.map(|s| format!("Size: {s}")), color.map(|c| format!("Color: {c}"))];
        let details = parts.into_iter().flatten().collect::<Vec<_>>().join(", ");
        self.variant_details = (!details.is_empty()).then_some(details);
        self
    }
}

//--------------------------------------         Cart          ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    pub user_id: Option<String>,
    pub session_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub variant_id: i64,
    pub quantity: i64,
    /// The variant price at the time the item was added
    pub unit_price: Money,
    pub added_at: DateTime<Utc>,
}

/// One line of a cart as the checkout sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub variant_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

impl From<&CartItem> for CartLine {
    fn from(item: &CartItem) -> Self {
        Self { variant_id: item.variant_id, quantity: item.quantity, unit_price: item.unit_price }
    }
}

/// An immutable copy of a cart's lines, handed from the cart to the order commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub cart_id: i64,
    pub owner: ActorContext,
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

//--------------------------------------       Delivery        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DeliveryStation {
    pub id: i64,
    pub name: String,
    pub county: String,
    pub address: String,
    pub delivery_fee: Money,
    pub phone_number: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeliveryStation {
    pub name: String,
    pub county: String,
    pub address: String,
    pub delivery_fee: Money,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ShippingZone {
    pub id: i64,
    pub name: String,
    pub shipping_cost: Money,
    pub estimated_delivery_days: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShippingZone {
    pub name: String,
    pub shipping_cost: Money,
    pub estimated_delivery_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    Domestic,
    International,
}

impl Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Domestic => write!(f, "domestic"),
            Self::International => write!(f, "international"),
        }
    }
}

/// The customer's choice of delivery method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DeliverySelection {
    /// Collect from, or deliver via, a domestic pickup station
    Station { station_id: i64 },
    /// Ship abroad via an international zone
    Zone { zone_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    pub selection: DeliverySelection,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub shipping_phone: Option<String>,
}

/// A validated delivery choice, with its fee and the address and phone that go on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDelivery {
    pub delivery_type: DeliveryType,
    pub station_id: Option<i64>,
    pub zone_id: Option<i64>,
    pub fee: Money,
    pub shipping_address: String,
    pub shipping_phone: String,
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub user_id: Option<String>,
    pub session_key: Option<String>,
    pub status: OrderStatusType,
    pub currency: String,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total_amount: Money,
    pub delivery_type: DeliveryType,
    pub delivery_station_id: Option<i64>,
    pub shipping_zone_id: Option<i64>,
    pub shipping_address: String,
    pub shipping_phone: String,
    pub customer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn owner(&self) -> Option<ActorContext> {
        ActorContext::from_columns(self.user_id.as_deref(), self.session_key.as_deref())
    }

    pub fn is_owned_by(&self, actor: &ActorContext) -> bool {
        self.owner().as_ref() == Some(actor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub variant_id: i64,
    pub product_name: String,
    pub variant_details: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
}

/// One entry in an order's append-only status history
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderStatusEvent {
    pub id: i64,
    pub order_id: i64,
    pub status: OrderStatusType,
    pub actor: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything the ledger needs to write a new order in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub owner: ActorContext,
    pub cart_id: i64,
    pub currency: String,
    pub lines: Vec<CartLine>,
    pub delivery: ResolvedDelivery,
    pub customer_notes: Option<String>,
}

impl NewOrder {
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn total(&self) -> Money {
        self.subtotal() + self.delivery.fee
    }
}

/// What a payment attempt means for the order it pays for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum PaymentOutcome {
    Succeeded,
    Failed(String),
}

impl PaymentOutcome {
    pub fn failed<S: Into<String>>(reason: S) -> Self {
        Self::Failed(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

//--------------------------------------       Payment         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct PaymentId(pub String);

impl PaymentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PaymentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Mobile-money push: the customer approves on their handset
    Push,
    /// Hosted checkout: the customer is redirected to the provider and back
    Redirect,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Redirect => write!(f, "redirect"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Processing,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The thing a payment pays for. Orders are the only subject the checkout produces, but the ledger keeps the subject
/// generic so other payable records can share the payments table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum PaymentSubject {
    Order(i64),
    Purchase(i64),
    Subscription(i64),
}

impl PaymentSubject {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Order(_) => "order",
            Self::Purchase(_) => "purchase",
            Self::Subscription(_) => "subscription",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Order(id) | Self::Purchase(id) | Self::Subscription(id) => *id,
        }
    }

    pub fn from_columns(kind: &str, id: i64) -> Result<Self, ConversionError> {
        match kind {
            "order" => Ok(Self::Order(id)),
            "purchase" => Ok(Self::Purchase(id)),
            "subscription" => Ok(Self::Subscription(id)),
            _ => Err(ConversionError(format!("payment subject: {kind}"))),
        }
    }
}

impl Display for PaymentSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.kind(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub payment_id: PaymentId,
    pub subject: PaymentSubject,
    pub method: PaymentMethod,
    /// The amount charged, in the order's currency
    pub amount: Money,
    pub currency: String,
    /// The amount the provider settles in, when it differs from the order currency
    pub settlement_amount: Option<Money>,
    pub settlement_currency: Option<String>,
    pub status: PaymentStatus,
    /// The provider's identifier for this attempt. Absent until the provider accepts the request.
    pub correlation_id: Option<String>,
    pub payer_reference: Option<String>,
    pub receipt: Option<String>,
    /// The last raw payload received from the provider
    pub gateway_response: Option<Value>,
    pub failure_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Payment {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("subject_kind")?;
        let subject_id: i64 = row.try_get("subject_id")?;
        let subject = PaymentSubject::from_columns(&kind, subject_id)
            .map_err(|e| sqlx::Error::ColumnDecode { index: "subject_kind".into(), source: Box::new(e) })?;
        let gateway_response: Option<Json<Value>> = row.try_get("gateway_response")?;
        Ok(Self {
            id: row.try_get("id")?,
            payment_id: row.try_get("payment_id")?,
            subject,
            method: row.try_get("method")?,
            amount: row.try_get("amount")?,
            currency: row.try_get("currency")?,
            settlement_amount: row.try_get("settlement_amount")?,
            settlement_currency: row.try_get("settlement_currency")?,
            status: row.try_get("status")?,
            correlation_id: row.try_get("correlation_id")?,
            payer_reference: row.try_get("payer_reference")?,
            receipt: row.try_get("receipt")?,
            gateway_response: gateway_response.map(|j| j.0),
            failure_reason: row.try_get("failure_reason")?,
            paid_at: row.try_get("paid_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A payment attempt about to be recorded, before the provider has been contacted.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub subject: PaymentSubject,
    pub method: PaymentMethod,
    pub amount: Money,
    pub currency: String,
    pub settlement_amount: Option<Money>,
    pub settlement_currency: Option<String>,
    pub payer_reference: Option<String>,
}

impl NewPayment {
    pub fn for_order(order: &Order, method: PaymentMethod) -> Self {
        Self {
            subject: PaymentSubject::Order(order.id),
            method,
            amount: order.total_amount,
            currency: order.currency.clone(),
            settlement_amount: None,
            settlement_currency: None,
            payer_reference: None,
        }
    }

    pub fn with_settlement(mut self, amount: Money, currency: &str) -> Self {
        self.settlement_amount = Some(amount);
        self.settlement_currency = Some(currency.to_string());
        self
    }

    pub fn with_payer_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.payer_reference = Some(reference.into());
        self
    }
}
