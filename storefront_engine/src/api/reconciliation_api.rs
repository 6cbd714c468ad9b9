//! The single entry point for payment provider notifications.
//!
//! Providers deliver callbacks late, out of order and more than once. Every delivery is applied with a compare-and-set
//! on the payment row, so only the first one for a payment has any effect; the rest are reported as replays.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::PaymentOutcome,
    events::{EventProducers, ReconciliationConflictEvent, UnmatchedCallbackEvent},
    traits::{CallbackEvent, CallbackOutcome, PaymentManagement, PaymentManagementError, ReconcileOutcome},
};

pub struct ReconciliationApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B>
where B: PaymentManagement
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    /// Applies one callback. The payment and, for order payments, the order are updated in the same transaction.
    ///
    /// Unknown correlation ids and duplicate deliveries are not errors. The caller should acknowledge the provider for
    /// every outcome, including `Err`, so that the provider stops retrying.
    pub async fn process(&self, event: CallbackEvent) -> Result<ReconcileOutcome, PaymentManagementError> {
        let correlation_id = event.correlation_id.clone();
        trace!("🧾️ Reconciling callback for {correlation_id}");
        let outcome = self.db.reconcile_payment(&event).await?;
        match &outcome {
            ReconcileOutcome::Applied { payment, order } => {
                info!("🧾️ Payment {} ({correlation_id}) is now {}", payment.payment_id, payment.status);
                if let Some(applied) = order {
                    let order_outcome = match &event.outcome {
                        CallbackOutcome::Succeeded { .. } => PaymentOutcome::Succeeded,
                        CallbackOutcome::Failed { reason } => PaymentOutcome::failed(reason.as_str()),
                    };
                    self.producers.publish_payment_outcome(applied, &order_outcome).await;
                }
            },
            ReconcileOutcome::Replayed { payment } => {
                debug!(
                    "🧾️ Duplicate callback for payment {} ({correlation_id}). It is already {}",
                    payment.payment_id, payment.status
                );
            },
            ReconcileOutcome::Unmatched { correlation_id } => {
                warn!("🧾️ No payment matches callback correlation id {correlation_id}. Dropping it");
                for emitter in &self.producers.unmatched_callback_producer {
                    let ev = UnmatchedCallbackEvent { correlation_id: correlation_id.clone(), payload: event.raw.clone() };
                    emitter.publish_event(ev).await;
                }
            },
            ReconcileOutcome::Conflict { payment, order } => {
                error!(
                    "🧾️ Payment {} settled as {} but order {} is {}. This needs manual attention",
                    payment.payment_id, payment.status, order.order_number, order.status
                );
                for emitter in &self.producers.reconciliation_conflict_producer {
                    let ev = ReconciliationConflictEvent { payment: payment.clone(), order: order.clone() };
                    emitter.publish_event(ev).await;
                }
            },
        }
        Ok(outcome)
    }
}
