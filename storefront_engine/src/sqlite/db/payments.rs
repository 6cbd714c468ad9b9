use log::{debug, trace, warn};
use serde_json::Value;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{NewPayment, OrderStatusType, Payment, PaymentId, PaymentMethod, PaymentStatus, PaymentSubject},
    helpers::new_payment_id,
    sqlite::db::{is_unique_violation, orders},
    traits::{CallbackEvent, CallbackOutcome, PaymentManagementError},
};

pub const SUPERSEDED_REASON: &str = "superseded";

pub async fn fetch_payment(
    payment_id: &PaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE payment_id = $1")
        .bind(payment_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_payment_by_correlation_id(
    correlation_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE correlation_id = $1")
        .bind(correlation_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_payments_for_subject(
    subject: PaymentSubject,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE subject_kind = $1 AND subject_id = $2 ORDER BY id")
        .bind(subject.kind())
        .bind(subject.id())
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

pub async fn fetch_in_flight_payment(
    subject: PaymentSubject,
    method: Option<PaymentMethod>,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            SELECT * FROM payments
            WHERE subject_kind = $1 AND subject_id = $2 AND status = 'processing' AND ($3 IS NULL OR method = $3)
        "#,
    )
    .bind(subject.kind())
    .bind(subject.id())
    .bind(method)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            INSERT INTO payments (
                payment_id,
                subject_kind,
                subject_id,
                method,
                amount,
                currency,
                settlement_amount,
                settlement_currency,
                payer_reference
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(new_payment_id().as_str())
    .bind(payment.subject.kind())
    .bind(payment.subject.id())
    .bind(payment.method)
    .bind(payment.amount)
    .bind(payment.currency)
    .bind(payment.settlement_amount)
    .bind(payment.settlement_currency)
    .bind(payment.payer_reference)
    .fetch_one(conn)
    .await?;
    Ok(payment)
}

/// Records a new attempt in `processing`. Not atomic on its own; run it in a transaction.
///
/// For order subjects the order row is locked first and must be `pending`. Another attempt in flight is either
/// rejected or, with `supersede`, failed in the same transaction.
pub async fn begin_payment_attempt(
    payment: NewPayment,
    supersede: bool,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentManagementError> {
    let subject = payment.subject;
    if let PaymentSubject::Order(order_id) = subject {
        let order = orders::lock_order_by_id(order_id, conn)
            .await?
            .ok_or(PaymentManagementError::SubjectNotFound(subject))?;
        if order.status != OrderStatusType::Pending {
            return Err(PaymentManagementError::OrderNotPayable {
                order_number: order.order_number,
                status: order.status,
            });
        }
    }
    if let Some(prior) = fetch_in_flight_payment(subject, None, conn).await? {
        if !supersede {
            debug!("🗃️ Payment {} is still in flight for {subject}", prior.payment_id);
            return Err(PaymentManagementError::PaymentInProgress(prior.payment_id));
        }
        let prior = fail_payment(&prior.payment_id, SUPERSEDED_REASON, None, conn).await?;
        debug!("🗃️ Payment {} for {subject} has been superseded", prior.payment_id);
    }
    match insert_payment(payment, conn).await {
        Ok(p) => {
            debug!("🗃️ Payment {} ({}) for {subject} is processing", p.payment_id, p.method);
            Ok(p)
        },
        Err(e) if is_unique_violation(&e) => {
            let prior = fetch_in_flight_payment(subject, None, conn).await?;
            match prior {
                Some(p) => Err(PaymentManagementError::PaymentInProgress(p.payment_id)),
                None => Err(e.into()),
            }
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn attach_correlation_id(
    payment_id: &PaymentId,
    correlation_id: &str,
    response: Value,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentManagementError> {
    let payment: Option<Payment> = sqlx::query_as(
        r#"
            UPDATE payments SET correlation_id = $1, gateway_response = $2, updated_at = CURRENT_TIMESTAMP
            WHERE payment_id = $3
            RETURNING *;
        "#,
    )
    .bind(correlation_id)
    .bind(Json(response))
    .bind(payment_id.as_str())
    .fetch_optional(conn)
    .await?;
    let payment = payment.ok_or_else(|| PaymentManagementError::PaymentNotFound(payment_id.to_string()))?;
    if payment.status.is_terminal() {
        warn!("🗃️ Correlation id {correlation_id} attached to payment {payment_id}, which is already {}", payment.status);
    }
    Ok(payment)
}

/// Moves a `processing` attempt to `failed`. The order the payment is for is left alone.
pub async fn fail_payment(
    payment_id: &PaymentId,
    reason: &str,
    response: Option<Value>,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentManagementError> {
    let payment: Option<Payment> = sqlx::query_as(
        r#"
            UPDATE payments
            SET status = 'failed',
                failure_reason = $1,
                gateway_response = COALESCE($2, gateway_response),
                updated_at = CURRENT_TIMESTAMP
            WHERE payment_id = $3 AND status = 'processing'
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(response.map(Json))
    .bind(payment_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    match payment {
        Some(p) => {
            trace!("🗃️ Payment {payment_id} failed: {reason}");
            Ok(p)
        },
        None => match fetch_payment(payment_id, conn).await? {
            Some(p) => Err(PaymentManagementError::PaymentAlreadyFinal(p.payment_id)),
            None => Err(PaymentManagementError::PaymentNotFound(payment_id.to_string())),
        },
    }
}

/// Compare-and-set of a `processing` payment to the outcome reported by the provider. Returns `None` if no payment
/// with this correlation id is still processing: either it does not exist, or a previous delivery of the same
/// callback has already settled it.
pub async fn settle_payment(event: &CallbackEvent, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let (status, receipt, reason) = match &event.outcome {
        CallbackOutcome::Succeeded { receipt } => (PaymentStatus::Completed, receipt.clone(), None),
        CallbackOutcome::Failed { reason } => (PaymentStatus::Failed, None, Some(reason.clone())),
    };
    let payment = sqlx::query_as(
        r#"
            UPDATE payments
            SET status = $1,
                receipt = COALESCE($2, receipt),
                failure_reason = $3,
                gateway_response = $4,
                paid_at = CASE WHEN $1 = 'completed' THEN CURRENT_TIMESTAMP ELSE paid_at END,
                updated_at = CURRENT_TIMESTAMP
            WHERE correlation_id = $5 AND status = 'processing'
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(receipt)
    .bind(reason)
    .bind(Json(event.raw.clone()))
    .bind(event.correlation_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}
