//! Order state machine rules.
//!
//! ```text
//!   pending ──► confirmed ──► processing ──► shipped ──► delivered
//!      │
//!      └──────► cancelled
//! ```
//!
//! These functions are pure. The ledger calls them inside the transaction that holds the order row so that the
//! decision and the write see the same state.
use crate::db_types::{OrderStatusType, PaymentOutcome};

/// What applying a payment outcome to an order in a given status should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeDecision {
    /// Move the order to the given status and record a status event
    Transition(OrderStatusType),
    /// The order already reflects this outcome. Nothing is written.
    Replay,
    /// The order has moved somewhere this outcome cannot follow.
    Conflict,
}

pub fn decide_payment_outcome(current: OrderStatusType, outcome: &PaymentOutcome) -> OutcomeDecision {
    use OrderStatusType::*;
    match (current, outcome) {
        (Pending, PaymentOutcome::Succeeded) => OutcomeDecision::Transition(Confirmed),
        (Pending, PaymentOutcome::Failed(_)) => OutcomeDecision::Transition(Cancelled),
        (Confirmed | Processing | Shipped | Delivered, PaymentOutcome::Succeeded) => OutcomeDecision::Replay,
        (Cancelled, PaymentOutcome::Failed(_)) => OutcomeDecision::Replay,
        (Cancelled, PaymentOutcome::Succeeded) => OutcomeDecision::Conflict,
        (Confirmed | Processing | Shipped | Delivered, PaymentOutcome::Failed(_)) => OutcomeDecision::Conflict,
    }
}

/// What a fulfilment request to move an order to `target` should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfilmentDecision {
    Advance,
    Replay,
    Illegal,
}

pub fn decide_fulfilment(current: OrderStatusType, target: OrderStatusType) -> FulfilmentDecision {
    if current == target && matches!(target, OrderStatusType::Processing | OrderStatusType::Shipped | OrderStatusType::Delivered)
    {
        return FulfilmentDecision::Replay;
    }
    match current.fulfilment_successor() {
        Some(next) if next == target => FulfilmentDecision::Advance,
        _ => FulfilmentDecision::Illegal,
    }
}
