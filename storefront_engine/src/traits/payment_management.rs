use serde_json::Value;
use thiserror::Error;

use crate::{
    db_types::{NewPayment, OrderNumber, OrderStatusType, Payment, PaymentId, PaymentMethod, PaymentSubject},
    traits::data_objects::{CallbackEvent, ReconcileOutcome},
};

#[derive(Debug, Clone, Error)]
pub enum PaymentManagementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The payment subject {0} does not exist")]
    SubjectNotFound(PaymentSubject),
    #[error("Order {order_number} is {status} and cannot be paid")]
    OrderNotPayable { order_number: OrderNumber, status: OrderStatusType },
    #[error("Payment {0} is still in progress for this order")]
    PaymentInProgress(PaymentId),
    #[error("Payment {0} does not exist")]
    PaymentNotFound(String),
    #[error("Payment {0} has already been settled")]
    PaymentAlreadyFinal(PaymentId),
}

impl From<sqlx::Error> for PaymentManagementError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// The payments ledger.
///
/// A payment row is written *before* the provider is contacted, so that every provider request can be traced. The row
/// starts in `processing` without a correlation id; the id is attached once the provider accepts the request.
#[allow(async_fn_in_trait)]
pub trait PaymentManagement {
    /// Records a new `processing` payment attempt. For order subjects, the order must be `pending`.
    ///
    /// If another attempt for the same subject is still `processing`, this fails with `PaymentInProgress` unless
    /// `supersede` is set, in which case the earlier attempt is marked `failed` in the same transaction.
    async fn begin_payment_attempt(&self, payment: NewPayment, supersede: bool)
        -> Result<Payment, PaymentManagementError>;

    /// Stores the provider's identifier and response for an accepted request
    async fn attach_correlation_id(
        &self,
        payment_id: &PaymentId,
        correlation_id: &str,
        response: Value,
    ) -> Result<Payment, PaymentManagementError>;

    /// Marks a `processing` attempt as failed without touching the order it was paying for.
    async fn fail_payment_attempt(
        &self,
        payment_id: &PaymentId,
        reason: &str,
        response: Option<Value>,
    ) -> Result<Payment, PaymentManagementError>;

    /// Applies a provider callback in one transaction. The payment moves out of `processing` with a compare-and-set,
    /// so concurrent or repeated deliveries of the same callback are applied exactly once. For order payments the
    /// order outcome is applied in the same transaction.
    async fn reconcile_payment(&self, event: &CallbackEvent) -> Result<ReconcileOutcome, PaymentManagementError>;

    async fn fetch_payment_by_correlation_id(
        &self,
        correlation_id: &str,
    ) -> Result<Option<Payment>, PaymentManagementError>;

    /// All attempts for the subject, oldest first
    async fn fetch_payments_for_subject(&self, subject: PaymentSubject) -> Result<Vec<Payment>, PaymentManagementError>;

    /// The attempt currently `processing` for the subject, optionally restricted to one method
    async fn fetch_in_flight_payment(
        &self,
        subject: PaymentSubject,
        method: Option<PaymentMethod>,
    ) -> Result<Option<Payment>, PaymentManagementError>;
}
