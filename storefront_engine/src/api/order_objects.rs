use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        DeliveryStation,
        Money,
        Order,
        OrderItem,
        OrderStatusEvent,
        OrderStatusType,
        Payment,
        PaymentId,
        PaymentMethod,
        PaymentStatus,
        ShippingZone,
        StockStatus,
    },
    traits::CartItemDetail,
};

/// The order and its items, as written by a successful checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryQuote {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

/// The delivery choices offered at checkout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOptions {
    pub stations: Vec<DeliveryStation>,
    pub zones: Vec<ShippingZone>,
}

/// A payment as the customer may see it. Raw provider payloads are never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub payment_id: PaymentId,
    pub method: PaymentMethod,
    pub amount: Money,
    pub currency: String,
    pub settlement_amount: Option<Money>,
    pub settlement_currency: Option<String>,
    pub status: PaymentStatus,
    pub receipt: Option<String>,
    pub failure_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentSummary {
    fn from(p: Payment) -> Self {
        Self {
            payment_id: p.payment_id,
            method: p.method,
            amount: p.amount,
            currency: p.currency,
            settlement_amount: p.settlement_amount,
            settlement_currency: p.settlement_currency,
            status: p.status,
            receipt: p.receipt,
            failure_reason: p.failure_reason,
            paid_at: p.paid_at,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// One step of the customer-facing progress bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingStep {
    pub status: OrderStatusType,
    pub label: String,
    pub reached: bool,
    pub current: bool,
    pub reached_at: Option<DateTime<Utc>>,
}

/// Projects the status history onto the five happy-path steps. A cancelled order shows only the steps it reached, none
/// of them current.
pub fn tracking_steps(order: &Order, history: &[OrderStatusEvent]) -> Vec<TrackingStep> {
    let position = |s: OrderStatusType| OrderStatusType::HAPPY_PATH.iter().position(|p| *p == s);
    let reached_up_to = history.iter().filter_map(|e| position(e.status)).max();
    OrderStatusType::HAPPY_PATH
        .iter()
        .enumerate()
        .map(|(i, status)| {
            let reached_at = history.iter().find(|e| e.status == *status).map(|e| e.created_at);
            TrackingStep {
                status: *status,
                label: status.tracking_label().to_string(),
                reached: reached_up_to.map(|r| i <= r).unwrap_or(false),
                current: order.status == *status,
                reached_at,
            }
        })
        .collect()
}

/// Everything the status page shows about one order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub history: Vec<OrderStatusEvent>,
    pub payments: Vec<PaymentSummary>,
    pub tracking: Vec<TrackingStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartViewLine {
    pub variant_id: i64,
    pub sku: String,
    pub name: String,
    pub variant_details: Option<String>,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
    pub stock_status: StockStatus,
}

impl From<&CartItemDetail> for CartViewLine {
    fn from(detail: &CartItemDetail) -> Self {
        let CartItemDetail { item, variant } = detail;
        Self {
            variant_id: item.variant_id,
            sku: variant.sku.clone(),
            name: variant.name.clone(),
            variant_details: variant.variant_details.clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
            line_total: item.unit_price * item.quantity,
            stock_status: variant.stock_status(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub lines: Vec<CartViewLine>,
    pub subtotal: Money,
    pub item_count: i64,
}

impl CartView {
    pub fn new(details: &[CartItemDetail]) -> Self {
        let lines = details.iter().map(CartViewLine::from).collect::<Vec<_>>();
        let subtotal = lines.iter().map(|l| l.line_total).sum();
        let item_count = lines.iter().map(|l| l.quantity).sum();
        Self { lines, subtotal, item_count }
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::db_types::{DeliveryType, OrderNumber};

    fn order(status: OrderStatusType) -> Order {
        let now = Utc::now();
        Order {
            id: 1,
            order_number: OrderNumber::from("ORD-20241017-ABCDEF"),
            user_id: Some("alice".into()),
            session_key: None,
            status,
            currency: "KES".into(),
            subtotal: Money::from(1000),
            delivery_fee: Money::from(200),
            total_amount: Money::from(1200),
            delivery_type: DeliveryType::Domestic,
            delivery_station_id: Some(1),
            shipping_zone_id: None,
            shipping_address: "Station, Road".into(),
            shipping_phone: "0712345678".into(),
            customer_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn event(id: i64, status: OrderStatusType) -> OrderStatusEvent {
        OrderStatusEvent { id, order_id: 1, status, actor: None, note: None, created_at: Utc::now() }
    }

    #[test]
    fn tracking_a_shipped_order() {
        use OrderStatusType::*;
        let history = vec![event(1, Pending), event(2, Confirmed), event(3, Processing), event(4, Shipped)];
        let steps = tracking_steps(&order(Shipped), &history);
        assert_eq!(steps.len(), 5);
        assert_eq!(steps[0].label, "Order Placed");
        assert!(steps[..4].iter().all(|s| s.reached));
        assert!(!steps[4].reached);
        assert!(steps[3].current);
        assert_eq!(steps.iter().filter(|s| s.current).count(), 1);
    }

    #[test]
    fn tracking_a_cancelled_order() {
        use OrderStatusType::*;
        let history = vec![event(1, Pending), event(2, Cancelled)];
        let steps = tracking_steps(&order(Cancelled), &history);
        assert!(steps[0].reached);
        assert!(steps[1..].iter().all(|s| !s.reached));
        assert!(steps.iter().all(|s| !s.current));
    }
}
