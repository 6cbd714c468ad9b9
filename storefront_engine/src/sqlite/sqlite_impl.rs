//! `SqliteDatabase` is a concrete implementation of a storefront engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::Duration;
use log::*;
use serde_json::Value;
use sqlx::SqlitePool;

use super::db::{carts, db_url, delivery, exchange_rates, inventory, new_pool, orders, payments};
use crate::{
    api::exchange_objects::ExchangeRate,
    db_types::{
        ActorContext,
        Cart,
        CartItem,
        CartSnapshot,
        DeliveryRequest,
        DeliverySelection,
        DeliveryStation,
        NewDeliveryStation,
        NewOrder,
        NewPayment,
        NewShippingZone,
        NewVariant,
        Order,
        OrderItem,
        OrderNumber,
        OrderStatusEvent,
        OrderStatusType,
        Payment,
        PaymentId,
        PaymentMethod,
        PaymentOutcome,
        PaymentSubject,
        ProductVariant,
        ResolvedDelivery,
        ShippingZone,
    },
    traits::{
        resolve_for_station,
        resolve_for_zone,
        CallbackEvent,
        CallbackOutcome,
        CartError,
        CartItemDetail,
        CartManagement,
        DeliveryError,
        DeliveryPricing,
        ExchangeRateError,
        ExchangeRates,
        InventoryError,
        InventoryManagement,
        OrderManagement,
        OrderManagementError,
        OrderPage,
        OutcomeApplied,
        Pagination,
        PaymentManagement,
        PaymentManagementError,
        ReconcileOutcome,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Commits a checkout in one transaction. The stock reservation is the first statement, so concurrent checkouts
    /// queue behind each other here rather than racing on the stock check.
    async fn commit_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), OrderManagementError> {
        let mut tx = self.pool.begin().await?;
        let reserved = inventory::reserve(&order.lines, &mut tx).await?;
        let new_order = orders::insert_order(&order, &mut tx).await?;
        let items = orders::insert_items(new_order.id, &reserved, &mut tx).await?;
        let actor = order.owner.to_string();
        orders::insert_status_event(
            new_order.id,
            OrderStatusType::Pending,
            Some(actor.as_str()),
            Some("Order created"),
            &mut tx,
        )
        .await?;
        carts::consume_lines(order.cart_id, &order.lines, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} saved with id {} and {} items", new_order.order_number, new_order.id, items.len());
        Ok((new_order, items))
    }

    async fn apply_payment_outcome(
        &self,
        order_number: &OrderNumber,
        outcome: &PaymentOutcome,
        actor: &str,
    ) -> Result<OutcomeApplied, OrderManagementError> {
        let mut tx = self.pool.begin().await?;
        let applied = orders::apply_payment_outcome(order_number, outcome, actor, &mut tx).await?;
        tx.commit().await?;
        Ok(applied)
    }

    async fn advance_order_status(
        &self,
        order_number: &OrderNumber,
        new_status: OrderStatusType,
        actor: &str,
        note: Option<&str>,
    ) -> Result<OutcomeApplied, OrderManagementError> {
        let mut tx = self.pool.begin().await?;
        let applied = orders::advance_status(order_number, new_status, actor, note, &mut tx).await?;
        tx.commit().await?;
        Ok(applied)
    }

    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(order_number, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_items(order_id, &mut conn).await?)
    }

    async fn fetch_order_history(&self, order_id: i64) -> Result<Vec<OrderStatusEvent>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_history(order_id, &mut conn).await?)
    }

    async fn fetch_orders_for_owner(
        &self,
        owner: &ActorContext,
        page: Pagination,
    ) -> Result<OrderPage, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_orders_for_owner(owner, page, &mut conn).await?)
    }

    async fn fetch_stale_pending_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_stale_pending_orders(older_than, &mut conn).await?)
    }

    async fn close(&mut self) -> Result<(), OrderManagementError> {
        self.pool.close().await;
        Ok(())
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn begin_payment_attempt(
        &self,
        payment: NewPayment,
        supersede: bool,
    ) -> Result<Payment, PaymentManagementError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::begin_payment_attempt(payment, supersede, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn attach_correlation_id(
        &self,
        payment_id: &PaymentId,
        correlation_id: &str,
        response: Value,
    ) -> Result<Payment, PaymentManagementError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::attach_correlation_id(payment_id, correlation_id, response, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn fail_payment_attempt(
        &self,
        payment_id: &PaymentId,
        reason: &str,
        response: Option<Value>,
    ) -> Result<Payment, PaymentManagementError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fail_payment(payment_id, reason, response, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    /// Settles the payment and applies the outcome to its order in one transaction. The payment update comes first:
    /// it is the compare-and-set that decides whether this delivery of the callback is the one that counts.
    async fn reconcile_payment(&self, event: &CallbackEvent) -> Result<ReconcileOutcome, PaymentManagementError> {
        let mut tx = self.pool.begin().await?;
        let Some(payment) = payments::settle_payment(event, &mut tx).await? else {
            let existing = payments::fetch_payment_by_correlation_id(&event.correlation_id, &mut tx).await?;
            tx.commit().await?;
            return Ok(match existing {
                Some(payment) => ReconcileOutcome::Replayed { payment },
                None => ReconcileOutcome::Unmatched { correlation_id: event.correlation_id.clone() },
            });
        };
        let PaymentSubject::Order(order_id) = payment.subject else {
            tx.commit().await?;
            return Ok(ReconcileOutcome::Applied { payment, order: None });
        };
        let order = orders::fetch_order_by_id(order_id, &mut tx)
            .await?
            .ok_or(PaymentManagementError::SubjectNotFound(payment.subject))?;
        let outcome = match &event.outcome {
            CallbackOutcome::Succeeded { .. } => PaymentOutcome::Succeeded,
            CallbackOutcome::Failed { reason } => PaymentOutcome::failed(reason.as_str()),
        };
        let actor = format!("gateway:{}", payment.method);
        let result = match orders::apply_payment_outcome(&order.order_number, &outcome, &actor, &mut tx).await {
            Ok(applied) => ReconcileOutcome::Applied { payment, order: Some(applied) },
            Err(OrderManagementError::AlreadyTerminal { .. }) => ReconcileOutcome::Conflict { payment, order },
            Err(e) => return Err(PaymentManagementError::DatabaseError(e.to_string())),
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_payment_by_correlation_id(
        &self,
        correlation_id: &str,
    ) -> Result<Option<Payment>, PaymentManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment_by_correlation_id(correlation_id, &mut conn).await?)
    }

    async fn fetch_payments_for_subject(&self, subject: PaymentSubject) -> Result<Vec<Payment>, PaymentManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payments_for_subject(subject, &mut conn).await?)
    }

    async fn fetch_in_flight_payment(
        &self,
        subject: PaymentSubject,
        method: Option<PaymentMethod>,
    ) -> Result<Option<Payment>, PaymentManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_in_flight_payment(subject, method, &mut conn).await?)
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_or_create_cart(&self, owner: &ActorContext) -> Result<Cart, CartError> {
        let mut conn = self.pool.acquire().await?;
        Ok(carts::fetch_or_create_cart(owner, &mut conn).await?)
    }

    async fn fetch_cart_items(&self, owner: &ActorContext) -> Result<Vec<CartItemDetail>, CartError> {
        let mut conn = self.pool.acquire().await?;
        match carts::fetch_cart(owner, &mut conn).await? {
            Some(cart) => carts::fetch_item_details(cart.id, &mut conn).await,
            None => Ok(Vec::new()),
        }
    }

    async fn add_cart_item(&self, owner: &ActorContext, variant_id: i64, quantity: i64) -> Result<CartItem, CartError> {
        let mut tx = self.pool.begin().await?;
        let item = carts::add_item(owner, variant_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn update_cart_item(
        &self,
        owner: &ActorContext,
        variant_id: i64,
        quantity: i64,
    ) -> Result<CartItem, CartError> {
        let mut tx = self.pool.begin().await?;
        let item = carts::update_item(owner, variant_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn remove_cart_item(&self, owner: &ActorContext, variant_id: i64) -> Result<(), CartError> {
        let mut conn = self.pool.acquire().await?;
        carts::remove_item(owner, variant_id, &mut conn).await
    }

    async fn fetch_cart_snapshot(&self, owner: &ActorContext) -> Result<Option<CartSnapshot>, CartError> {
        let mut tx = self.pool.begin().await?;
        let snapshot = carts::fetch_snapshot(owner, &mut tx).await?;
        tx.commit().await?;
        Ok(snapshot)
    }

    async fn merge_carts(&self, session_key: &str, user_id: &str) -> Result<Cart, CartError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::merge(session_key, user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }
}

impl DeliveryPricing for SqliteDatabase {
    async fn fetch_active_stations(&self) -> Result<Vec<DeliveryStation>, DeliveryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(delivery::fetch_active_stations(&mut conn).await?)
    }

    async fn fetch_active_zones(&self) -> Result<Vec<ShippingZone>, DeliveryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(delivery::fetch_active_zones(&mut conn).await?)
    }

    async fn resolve_delivery(&self, request: &DeliveryRequest) -> Result<ResolvedDelivery, DeliveryError> {
        let mut conn = self.pool.acquire().await?;
        match request.selection {
            DeliverySelection::Station { station_id } => {
                let station = delivery::fetch_station(station_id, &mut conn)
                    .await?
                    .ok_or_else(|| DeliveryError::InvalidSelection(format!("Unknown delivery station {station_id}")))?;
                resolve_for_station(&station, request)
            },
            DeliverySelection::Zone { zone_id } => {
                let zone = delivery::fetch_zone(zone_id, &mut conn)
                    .await?
                    .ok_or_else(|| DeliveryError::InvalidSelection(format!("Unknown shipping zone {zone_id}")))?;
                resolve_for_zone(&zone, request)
            },
        }
    }

    async fn insert_station(&self, station: NewDeliveryStation) -> Result<DeliveryStation, DeliveryError> {
        let mut tx = self.pool.begin().await?;
        let station = delivery::insert_station(station, &mut tx).await?;
        tx.commit().await?;
        Ok(station)
    }

    async fn insert_zone(&self, zone: NewShippingZone) -> Result<ShippingZone, DeliveryError> {
        let mut tx = self.pool.begin().await?;
        let zone = delivery::insert_zone(zone, &mut tx).await?;
        tx.commit().await?;
        Ok(zone)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn insert_variant(&self, variant: NewVariant) -> Result<ProductVariant, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let variant = inventory::insert_variant(variant, &mut tx).await?;
        tx.commit().await?;
        Ok(variant)
    }

    async fn fetch_variant(&self, variant_id: i64) -> Result<Option<ProductVariant>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(inventory::fetch_variant(variant_id, &mut conn).await?)
    }

    async fn set_stock(&self, variant_id: i64, quantity: i64) -> Result<ProductVariant, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let variant = inventory::set_stock(variant_id, quantity, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Stock for variant {variant_id} set to {quantity}");
        Ok(variant)
    }
}

impl ExchangeRates for SqliteDatabase {
    async fn fetch_last_rate(&self, base: &str, quote: &str) -> Result<ExchangeRate, ExchangeRateError> {
        let mut conn = self.pool.acquire().await?;
        exchange_rates::fetch_last_rate(base, quote, &mut conn).await
    }

    async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError> {
        let mut conn = self.pool.acquire().await?;
        exchange_rates::set_exchange_rate(rate, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
