use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::{CartItem, Order, OrderStatusType, Payment, ProductVariant};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn page(page: u32) -> Self {
        Self { page: page.max(1), ..Default::default() }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub page: u32,
    pub per_page: u32,
    pub total_orders: i64,
}

impl OrderPage {
    pub fn total_pages(&self) -> i64 {
        let per_page = i64::from(self.per_page.max(1));
        (self.total_orders + per_page - 1) / per_page
    }
}

/// A cart line joined with the live variant record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemDetail {
    pub item: CartItem,
    pub variant: ProductVariant,
}

/// The result of applying a payment outcome or a fulfilment step to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum OutcomeApplied {
    /// The order moved from `old_status` to `order.status`, and a status event was appended.
    Transitioned { old_status: OrderStatusType, order: Order },
    /// The order already reflected the outcome. Nothing was written.
    Replayed { order: Order },
}

impl OutcomeApplied {
    pub fn order(&self) -> &Order {
        match self {
            Self::Transitioned { order, .. } | Self::Replayed { order } => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            Self::Transitioned { order, .. } | Self::Replayed { order } => order,
        }
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transitioned { .. })
    }
}

/// The outcome a payment provider reported for one payment attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CallbackOutcome {
    Succeeded { receipt: Option<String> },
    Failed { reason: String },
}

/// A provider notification, normalised so that the reconciliation logic does not care which provider sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackEvent {
    pub correlation_id: String,
    pub outcome: CallbackOutcome,
    /// The payload exactly as the provider sent it
    pub raw: Value,
}

impl CallbackEvent {
    pub fn succeeded<S: Into<String>>(correlation_id: S, receipt: Option<String>, raw: Value) -> Self {
        Self { correlation_id: correlation_id.into(), outcome: CallbackOutcome::Succeeded { receipt }, raw }
    }

    pub fn failed<S: Into<String>, R: Into<String>>(correlation_id: S, reason: R, raw: Value) -> Self {
        Self { correlation_id: correlation_id.into(), outcome: CallbackOutcome::Failed { reason: reason.into() }, raw }
    }
}

/// What reconciling a callback did to the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum ReconcileOutcome {
    /// The payment moved to its terminal state. For order payments, `order` holds what happened to the order.
    Applied { payment: Payment, order: Option<OutcomeApplied> },
    /// The payment was already terminal. Nothing was written.
    Replayed { payment: Payment },
    /// No payment carries this correlation id
    Unmatched { correlation_id: String },
    /// The payment was recorded, but the order had already moved somewhere the outcome cannot follow (e.g. a success
    /// arriving for an order that was cancelled in the meantime). Needs manual attention.
    Conflict { payment: Payment, order: Order },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpiryResult {
    pub cancelled: Vec<Order>,
    /// Orders that moved on before the sweep reached them
    pub skipped: usize,
}

impl ExpiryResult {
    pub fn count(&self) -> usize {
        self.cancelled.len()
    }
}
