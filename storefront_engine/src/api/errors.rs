use thiserror::Error;

use crate::{
    db_types::{OrderNumber, OrderStatusType},
    traits::{CartError, DeliveryError, OrderManagementError, PaymentManagementError},
};

/// Why a checkout was turned away. Nothing was written when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitRejection {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Invalid quantity {quantity} for variant {variant_id}")]
    InvalidQuantity { variant_id: i64, quantity: i64 },
    #[error("Insufficient stock for variant {variant_id}. {requested} requested, {available} available")]
    InsufficientStock { variant_id: i64, requested: i64, available: i64 },
    #[error("Product variant {0} is no longer for sale")]
    UnknownVariant(i64),
    #[error("Invalid delivery selection: {0}")]
    InvalidDeliverySelection(String),
    #[error("The cart changed during checkout. It may already have been ordered")]
    CartChanged,
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Checkout rejected: {0}")]
    Rejected(#[from] CommitRejection),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("Order {order_number} is already {status}")]
    AlreadyTerminal { order_number: OrderNumber, status: OrderStatusType },
    #[error("Order {order_number} cannot move from {from} to {to}")]
    IllegalTransition { order_number: OrderNumber, from: OrderStatusType, to: OrderStatusType },
    #[error("Could not allocate a unique order number after {0} attempts")]
    OrderNumberExhausted(usize),
}

impl From<OrderManagementError> for OrderFlowError {
    fn from(e: OrderManagementError) -> Self {
        use OrderManagementError::*;
        match e {
            DatabaseError(s) => Self::DatabaseError(s),
            InsufficientStock { variant_id, requested, available } => {
                CommitRejection::InsufficientStock { variant_id, requested, available }.into()
            },
            UnknownVariant(id) => CommitRejection::UnknownVariant(id).into(),
            CartChanged(_) => CommitRejection::CartChanged.into(),
            OrderNumberCollision(n) => Self::DatabaseError(format!("Order number {n} collided")),
            OrderNotFound(n) => Self::OrderNotFound(n),
            AlreadyTerminal { order_number, status } => Self::AlreadyTerminal { order_number, status },
            IllegalTransition { order_number, from, to } => Self::IllegalTransition { order_number, from, to },
        }
    }
}

impl From<CartError> for OrderFlowError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::DatabaseError(s) => Self::DatabaseError(s),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<DeliveryError> for OrderFlowError {
    fn from(e: DeliveryError) -> Self {
        match e {
            DeliveryError::DatabaseError(s) => Self::DatabaseError(s),
            DeliveryError::InvalidSelection(s) | DeliveryError::MissingShippingDetails(s) => {
                CommitRejection::InvalidDeliverySelection(s).into()
            },
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderQueryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
}

impl From<OrderManagementError> for OrderQueryError {
    fn from(e: OrderManagementError) -> Self {
        match e {
            OrderManagementError::OrderNotFound(n) => Self::OrderNotFound(n),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<PaymentManagementError> for OrderQueryError {
    fn from(e: PaymentManagementError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
