use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    api::{
        errors::{CommitRejection, OrderFlowError},
        order_objects::{CommittedOrder, DeliveryOptions, DeliveryQuote},
    },
    db_types::{
        ActorContext,
        CartSnapshot,
        DeliveryRequest,
        NewOrder,
        Order,
        OrderItem,
        OrderNumber,
        OrderStatusType,
        PaymentOutcome,
    },
    events::{EventProducers, OrderCreatedEvent, OrderStatusChangedEvent},
    helpers::new_order_number,
    traits::{
        CartManagement,
        DeliveryError,
        DeliveryPricing,
        ExpiryResult,
        OrderManagement,
        OrderManagementError,
        OutcomeApplied,
    },
};

/// The number of fresh order numbers tried before a checkout gives up
pub const MAX_ORDER_NUMBER_ATTEMPTS: usize = 3;
/// The reason recorded on orders cancelled by the expiry sweep
pub const TIMEOUT_REASON: &str = "timeout";
pub const EXPIRY_ACTOR: &str = "system:expiry";

/// `OrderFlowApi` owns the order state machine. Checkouts, payment outcomes, cancellations and fulfilment steps all go
/// through here, and it is the only way an order's status changes.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    currency: String,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({})", self.currency)
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, currency: storefront_common::DEFAULT_HOME_CURRENCY.to_string() }
    }

    /// Sets the currency that new orders are priced in
    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn normalise_notes(notes: Option<String>) -> Option<String> {
    notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + CartManagement + DeliveryPricing
{
    /// Checks out the actor's current cart.
    pub async fn commit(
        &self,
        actor: &ActorContext,
        delivery: &DeliveryRequest,
        customer_notes: Option<String>,
    ) -> Result<CommittedOrder, OrderFlowError> {
        let snapshot = self.db.fetch_cart_snapshot(actor).await?.ok_or(CommitRejection::EmptyCart)?;
        self.commit_snapshot(snapshot, delivery, customer_notes).await
    }

    /// Turns a cart snapshot into a `pending` order.
    ///
    /// Input is validated and the delivery fee resolved before anything is written. The backend then reserves stock,
    /// writes the order, its items and its first status event, and consumes the cart lines in a single transaction. If
    /// any of those steps fails, none of them happen.
    ///
    /// Prices come from the snapshot, never from the live catalogue.
    pub async fn commit_snapshot(
        &self,
        snapshot: CartSnapshot,
        delivery: &DeliveryRequest,
        customer_notes: Option<String>,
    ) -> Result<CommittedOrder, OrderFlowError> {
        if snapshot.is_empty() {
            return Err(CommitRejection::EmptyCart.into());
        }
        if let Some(line) = snapshot.lines.iter().find(|l| l.quantity <= 0) {
            return Err(CommitRejection::InvalidQuantity { variant_id: line.variant_id, quantity: line.quantity }.into());
        }
        let delivery = self.db.resolve_delivery(delivery).await?;
        let customer_notes = normalise_notes(customer_notes);
        for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
            let order = NewOrder {
                order_number: new_order_number(Utc::now()),
                owner: snapshot.owner.clone(),
                cart_id: snapshot.cart_id,
                currency: self.currency.clone(),
                lines: snapshot.lines.clone(),
                delivery: delivery.clone(),
                customer_notes: customer_notes.clone(),
            };
            match self.db.commit_order(order).await {
                Ok((order, items)) => {
                    info!(
                        "🔄️📦️ Order {} committed for {}. {} items, total {} {}",
                        order.order_number,
                        snapshot.owner,
                        items.len(),
                        order.total_amount,
                        order.currency
                    );
                    self.call_order_created_hook(&order, &items).await;
                    return Ok(CommittedOrder { order, items });
                },
                Err(OrderManagementError::OrderNumberCollision(n)) => {
                    warn!("🔄️📦️ Order number {n} is taken (attempt {attempt}). Trying another");
                },
                Err(e) => {
                    debug!("🔄️📦️ Checkout for {} failed: {e}", snapshot.owner);
                    return Err(e.into());
                },
            }
        }
        error!("🔄️📦️ Could not allocate an order number after {MAX_ORDER_NUMBER_ATTEMPTS} attempts");
        Err(OrderFlowError::OrderNumberExhausted(MAX_ORDER_NUMBER_ATTEMPTS))
    }

    /// Prices the actor's cart for a delivery choice without committing anything.
    pub async fn quote_delivery(
        &self,
        actor: &ActorContext,
        delivery: &DeliveryRequest,
    ) -> Result<DeliveryQuote, OrderFlowError> {
        let snapshot = self
            .db
            .fetch_cart_snapshot(actor)
            .await?
            .filter(|s| !s.is_empty())
            .ok_or(CommitRejection::EmptyCart)?;
        let resolved = self.db.resolve_delivery(delivery).await?;
        let subtotal = snapshot.subtotal();
        Ok(DeliveryQuote { subtotal, delivery_fee: resolved.fee, total: subtotal + resolved.fee })
    }

    async fn call_order_created_hook(&self, order: &Order, items: &[OrderItem]) {
        for emitter in &self.producers.order_created_producer {
            debug!("🔄️📦️ Notifying order created hook subscribers");
            emitter.publish_event(OrderCreatedEvent::new(order.clone(), items.to_vec())).await;
        }
    }
}

impl<B> OrderFlowApi<B>
where B: DeliveryPricing
{
    /// The active pickup stations and shipping zones
    pub async fn delivery_options(&self) -> Result<DeliveryOptions, DeliveryError> {
        let stations = self.db.fetch_active_stations().await?;
        let zones = self.db.fetch_active_zones().await?;
        Ok(DeliveryOptions { stations, zones })
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Applies a payment outcome to a `pending` order: success confirms it, failure cancels it.
    ///
    /// Repeating an outcome the order already reflects is a no-op and returns [`OutcomeApplied::Replayed`].
    pub async fn apply_payment_outcome(
        &self,
        order_number: &OrderNumber,
        outcome: &PaymentOutcome,
        actor: &str,
    ) -> Result<OutcomeApplied, OrderFlowError> {
        let applied = self.db.apply_payment_outcome(order_number, outcome, actor).await?;
        match (&applied, outcome) {
            (OutcomeApplied::Transitioned { .. }, PaymentOutcome::Succeeded) => {
                info!("🔄️✅️ Order {order_number} confirmed by {actor}");
            },
            (OutcomeApplied::Transitioned { .. }, PaymentOutcome::Failed(reason)) => {
                info!("🔄️❌️ Order {order_number} cancelled by {actor}: {reason}");
            },
            (OutcomeApplied::Replayed { order }, _) => {
                debug!("🔄️ Order {order_number} is already {}. Nothing to do", order.status);
            },
        }
        self.producers.publish_payment_outcome(&applied, outcome).await;
        Ok(applied)
    }

    /// Abandons a pending order
    pub async fn cancel_order(
        &self,
        order_number: &OrderNumber,
        actor: &str,
        reason: &str,
    ) -> Result<OutcomeApplied, OrderFlowError> {
        self.apply_payment_outcome(order_number, &PaymentOutcome::failed(reason), actor).await
    }

    /// As [`Self::cancel_order`], for an order the actor must own. Orders belonging to someone else are reported as
    /// not found.
    pub async fn cancel_own_order(
        &self,
        owner: &ActorContext,
        order_number: &OrderNumber,
        reason: &str,
    ) -> Result<OutcomeApplied, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .filter(|o| o.is_owned_by(owner))
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_number.clone()))?;
        self.cancel_order(&order.order_number, &owner.to_string(), reason).await
    }

    /// Moves a paid order one step along its fulfilment path.
    pub async fn advance_status(
        &self,
        order_number: &OrderNumber,
        new_status: OrderStatusType,
        actor: &str,
        note: Option<&str>,
    ) -> Result<OutcomeApplied, OrderFlowError> {
        let applied = self.db.advance_order_status(order_number, new_status, actor, note).await?;
        if let OutcomeApplied::Transitioned { old_status, order } = &applied {
            info!("🔄️🚚️ Order {order_number} moved from {old_status} to {new_status} by {actor}");
            for emitter in &self.producers.status_changed_producer {
                emitter.publish_event(OrderStatusChangedEvent::new(order.clone(), *old_status)).await;
            }
        }
        Ok(applied)
    }

    /// Cancels every order that has been `pending` for longer than `window`.
    ///
    /// Orders that were paid or cancelled while the sweep was running are skipped. In-flight payments are left alone:
    /// if one succeeds later, reconciliation records it and flags the conflict.
    pub async fn expire_stale_orders(&self, window: Duration) -> Result<ExpiryResult, OrderFlowError> {
        let stale = self.db.fetch_stale_pending_orders(window).await?;
        let mut result = ExpiryResult::default();
        if stale.is_empty() {
            trace!("🔄️⏰️ No stale orders");
            return Ok(result);
        }
        debug!("🔄️⏰️ {} orders have been pending for longer than {window}", stale.len());
        let timeout = PaymentOutcome::failed(TIMEOUT_REASON);
        for order in stale {
            match self.apply_payment_outcome(&order.order_number, &timeout, EXPIRY_ACTOR).await {
                Ok(OutcomeApplied::Transitioned { order, .. }) => result.cancelled.push(order),
                Ok(OutcomeApplied::Replayed { .. }) | Err(OrderFlowError::AlreadyTerminal { .. }) => {
                    result.skipped += 1;
                },
                Err(e) => {
                    error!("🔄️⏰️ Could not expire order {}: {e}", order.order_number);
                    result.skipped += 1;
                },
            }
        }
        Ok(result)
    }
}
