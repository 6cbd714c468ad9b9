use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{ActorContext, NewOrder, Order, OrderItem, OrderNumber, OrderStatusEvent, OrderStatusType, PaymentOutcome},
    traits::{
        data_objects::{OrderPage, OutcomeApplied, Pagination},
        InventoryError,
    },
};

#[derive(Debug, Clone, Error)]
pub enum OrderManagementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Insufficient stock for variant {variant_id}. {requested} requested, {available} available")]
    InsufficientStock { variant_id: i64, requested: i64, available: i64 },
    #[error("Product variant {0} does not exist or is not for sale")]
    UnknownVariant(i64),
    #[error("Cart {0} changed while the order was being committed")]
    CartChanged(i64),
    #[error("Order number {0} is already taken")]
    OrderNumberCollision(OrderNumber),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("Order {order_number} is already {status} and cannot accept this change")]
    AlreadyTerminal { order_number: OrderNumber, status: OrderStatusType },
    #[error("Order {order_number} cannot move from {from} to {to}")]
    IllegalTransition { order_number: OrderNumber, from: OrderStatusType, to: OrderStatusType },
}

impl From<sqlx::Error> for OrderManagementError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<InventoryError> for OrderManagementError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::InsufficientStock { variant_id, requested, available } => {
                Self::InsufficientStock { variant_id, requested, available }
            },
            InventoryError::UnknownVariant(id) => Self::UnknownVariant(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

/// The order ledger.
///
/// Every method that changes an order runs as a single transaction. If any step fails, nothing is written.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Commits a checkout in one transaction:
    /// * reserves stock for every line, failing with `InsufficientStock` if any line cannot be met,
    /// * inserts the order in `pending` status with its items,
    /// * appends the initial status event, attributed to the order's owner,
    /// * removes the consumed lines from the owner's cart, failing with `CartChanged` if they are no longer there.
    async fn commit_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), OrderManagementError>;

    /// Applies a payment outcome to a `pending` order. See [`crate::lifecycle::decide_payment_outcome`] for the rules.
    /// Repeats of an outcome the order already reflects return [`OutcomeApplied::Replayed`]. Contradictory outcomes
    /// return `AlreadyTerminal`.
    async fn apply_payment_outcome(
        &self,
        order_number: &OrderNumber,
        outcome: &PaymentOutcome,
        actor: &str,
    ) -> Result<OutcomeApplied, OrderManagementError>;

    /// Moves a paid order one step along `confirmed → processing → shipped → delivered`.
    async fn advance_order_status(
        &self,
        order_number: &OrderNumber,
        new_status: OrderStatusType,
        actor: &str,
        note: Option<&str>,
    ) -> Result<OutcomeApplied, OrderManagementError>;

    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderManagementError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderManagementError>;

    /// The status history of an order, oldest first
    async fn fetch_order_history(&self, order_id: i64) -> Result<Vec<OrderStatusEvent>, OrderManagementError>;

    /// The owner's orders, newest first
    async fn fetch_orders_for_owner(
        &self,
        owner: &ActorContext,
        page: Pagination,
    ) -> Result<OrderPage, OrderManagementError>;

    /// `pending` orders created more than `older_than` ago
    async fn fetch_stale_pending_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderManagementError>;

    /// Closes the database connection pool
    async fn close(&mut self) -> Result<(), OrderManagementError>;
}
