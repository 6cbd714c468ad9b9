use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::{Order, OrderItem, OrderStatusType, Payment};

/// A checkout was committed. Stock has been reserved and the order is awaiting payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderCreatedEvent {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }
}

/// Payment for the order succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmedEvent {
    pub order: Order,
}

impl OrderConfirmedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// A pending order was cancelled: payment failed, the customer or an admin abandoned it, or it timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub reason: String,
}

impl OrderAnnulledEvent {
    pub fn new<S: Into<String>>(order: Order, reason: S) -> Self {
        Self { order, reason: reason.into() }
    }
}

/// A fulfilment step, e.g. `processing → shipped`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType) -> Self {
        Self { order, old_status }
    }

    pub fn new_status(&self) -> OrderStatusType {
        self.order.status
    }
}

/// A provider called back with a correlation id that no payment carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedCallbackEvent {
    pub correlation_id: String,
    pub payload: Value,
}

/// A payment settled against an order that had already moved on, e.g. money arrived for an order that the expiry
/// sweep had cancelled. Someone has to look at these by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationConflictEvent {
    pub payment: Payment,
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderConfirmed(OrderConfirmedEvent),
    OrderAnnulled(OrderAnnulledEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
    UnmatchedCallback(UnmatchedCallbackEvent),
    ReconciliationConflict(ReconciliationConflictEvent),
}
