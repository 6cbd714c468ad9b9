//! Read-only views of orders for customers and staff.
use std::fmt::Debug;

use log::*;

use crate::{
    api::{
        errors::OrderQueryError,
        order_objects::{tracking_steps, OrderDetail, PaymentSummary},
    },
    db_types::{ActorContext, Order, OrderNumber, PaymentSubject},
    traits::{OrderManagement, OrderPage, Pagination, PaymentManagement},
};

pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement + PaymentManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn orders_for(&self, owner: &ActorContext, page: Pagination) -> Result<OrderPage, OrderQueryError> {
        let page = self.db.fetch_orders_for_owner(owner, page).await?;
        trace!("🔄️ {} has {} orders", owner, page.total_orders);
        Ok(page)
    }

    pub async fn fetch_order(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderQueryError> {
        Ok(self.db.fetch_order_by_number(order_number).await?)
    }

    /// The order as its owner sees it. Someone else's order is reported as missing.
    pub async fn order_detail(
        &self,
        owner: &ActorContext,
        order_number: &OrderNumber,
    ) -> Result<OrderDetail, OrderQueryError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .filter(|o| o.is_owned_by(owner))
            .ok_or_else(|| OrderQueryError::OrderNotFound(order_number.clone()))?;
        self.detail_for(order).await
    }

    /// The order regardless of who owns it. For staff.
    pub async fn order_detail_admin(&self, order_number: &OrderNumber) -> Result<OrderDetail, OrderQueryError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .ok_or_else(|| OrderQueryError::OrderNotFound(order_number.clone()))?;
        self.detail_for(order).await
    }

    async fn detail_for(&self, order: Order) -> Result<OrderDetail, OrderQueryError> {
        let items = self.db.fetch_order_items(order.id).await?;
        let history = self.db.fetch_order_history(order.id).await?;
        let payments = self
            .db
            .fetch_payments_for_subject(PaymentSubject::Order(order.id))
            .await?
            .into_iter()
            .map(PaymentSummary::from)
            .collect();
        let tracking = tracking_steps(&order, &history);
        Ok(OrderDetail { order, items, history, payments, tracking })
    }
}
