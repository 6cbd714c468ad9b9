use chrono::{Duration, Utc};
use log::{debug, trace, warn};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{ActorContext, NewOrder, Order, OrderItem, OrderNumber, OrderStatusEvent, OrderStatusType, PaymentOutcome},
    lifecycle::{decide_fulfilment, decide_payment_outcome, FulfilmentDecision, OutcomeDecision},
    sqlite::db::{inventory::ReservedLine, is_unique_violation},
    traits::{OrderManagementError, OrderPage, OutcomeApplied, Pagination},
};

/// Inserts a new order in `pending` status. This is not atomic. Embed the call in the commit transaction, and pass
/// `&mut *tx` as the connection argument.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderManagementError> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                user_id,
                session_key,
                currency,
                subtotal,
                delivery_fee,
                total_amount,
                delivery_type,
                delivery_station_id,
                shipping_zone_id,
                shipping_address,
                shipping_phone,
                customer_notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(order.order_number.as_str())
    .bind(order.owner.user_id())
    .bind(order.owner.session_key())
    .bind(order.currency.as_str())
    .bind(order.subtotal())
    .bind(order.delivery.fee)
    .bind(order.total())
    .bind(order.delivery.delivery_type)
    .bind(order.delivery.station_id)
    .bind(order.delivery.zone_id)
    .bind(order.delivery.shipping_address.as_str())
    .bind(order.delivery.shipping_phone.as_str())
    .bind(order.customer_notes.as_deref())
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => Ok(order),
        Err(e) if is_unique_violation(&e) => Err(OrderManagementError::OrderNumberCollision(order.order_number.clone())),
        Err(e) => Err(e.into()),
    }
}

/// Copies the reserved lines onto the order. Names and details come from the variant, prices from the cart snapshot.
pub async fn insert_items(
    order_id: i64,
    lines: &[ReservedLine],
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    let mut items = Vec::with_capacity(lines.len());
    for ReservedLine { line, variant } in lines {
        let item = sqlx::query_as(
            r#"
                INSERT INTO order_items (order_id, variant_id, product_name, variant_details, quantity, unit_price,
                total_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *;
            "#,
        )
        .bind(order_id)
        .bind(line.variant_id)
        .bind(variant.name.as_str())
        .bind(variant.variant_details.as_deref())
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.line_total())
        .fetch_one(&mut *conn)
        .await?;
        items.push(item);
    }
    Ok(items)
}

/// Appends to the order's status history. Rows in `order_status_events` can never be changed afterwards.
pub async fn insert_status_event(
    order_id: i64,
    status: OrderStatusType,
    actor: Option<&str>,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<OrderStatusEvent, sqlx::Error> {
    let event = sqlx::query_as(
        "INSERT INTO order_status_events (order_id, status, actor, note) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(order_id)
    .bind(status)
    .bind(actor)
    .bind(note)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Order #{order_id} status event: {status}");
    Ok(event)
}

/// Reads an order while taking the database write lock, the SQLite stand-in for `SELECT .. FOR UPDATE`. The row
/// is not changed.
pub async fn lock_order(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET updated_at = updated_at WHERE order_number = $1 RETURNING *")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// As [`lock_order`], by row id
pub async fn lock_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET updated_at = updated_at WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await?;
    Ok(items)
}

/// The status history in append order
pub async fn fetch_order_history(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderStatusEvent>, sqlx::Error> {
    let events = sqlx::query_as("SELECT * FROM order_status_events WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(events)
}

fn push_owner_clause(builder: &mut QueryBuilder<'_, Sqlite>, owner: &ActorContext) {
    match owner {
        ActorContext::User(id) => {
            builder.push(" WHERE user_id = ");
            builder.push_bind(id.clone());
        },
        ActorContext::Session(key) => {
            builder.push(" WHERE session_key = ");
            builder.push_bind(key.clone());
        },
    }
}

/// The owner's orders, newest first
pub async fn fetch_orders_for_owner(
    owner: &ActorContext,
    page: Pagination,
    conn: &mut SqliteConnection,
) -> Result<OrderPage, sqlx::Error> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM orders");
    push_owner_clause(&mut count, owner);
    let total_orders: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM orders");
    push_owner_clause(&mut builder, owner);
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(page.limit());
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(OrderPage { orders, page: page.page.max(1), per_page: page.per_page, total_orders })
}

pub async fn fetch_stale_pending_orders(
    older_than: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let cutoff = (Utc::now() - older_than).timestamp();
    let orders =
        sqlx::query_as("SELECT * FROM orders WHERE status = 'pending' AND unixepoch(created_at) < $1 ORDER BY id")
            .bind(cutoff)
            .fetch_all(conn)
            .await?;
    Ok(orders)
}

async fn update_status(id: i64, status: OrderStatusType, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
        .bind(status)
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(order)
}

/// Changes the order status and appends the matching status event. The two writes always happen together.
async fn transition(
    order: Order,
    new_status: OrderStatusType,
    actor: &str,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<OutcomeApplied, sqlx::Error> {
    let old_status = order.status;
    let order = update_status(order.id, new_status, conn).await?;
    insert_status_event(order.id, new_status, Some(actor), note, conn).await?;
    debug!("🗃️ Order {} moved from {old_status} to {new_status} by {actor}", order.order_number);
    Ok(OutcomeApplied::Transitioned { old_status, order })
}

/// Applies a payment outcome to a locked order. Not atomic on its own; both the order API and the reconciliation of
/// provider callbacks call this inside their own transaction.
pub async fn apply_payment_outcome(
    order_number: &OrderNumber,
    outcome: &PaymentOutcome,
    actor: &str,
    conn: &mut SqliteConnection,
) -> Result<OutcomeApplied, OrderManagementError> {
    let order =
        lock_order(order_number, conn).await?.ok_or_else(|| OrderManagementError::OrderNotFound(order_number.clone()))?;
    match decide_payment_outcome(order.status, outcome) {
        OutcomeDecision::Transition(new_status) => {
            let note = match outcome {
                PaymentOutcome::Succeeded => "Payment confirmed".to_string(),
                PaymentOutcome::Failed(reason) => reason.clone(),
            };
            Ok(transition(order, new_status, actor, Some(note.as_str()), conn).await?)
        },
        OutcomeDecision::Replay => {
            debug!("🗃️ Order {order_number} is already {}. Outcome {outcome:?} is a replay", order.status);
            Ok(OutcomeApplied::Replayed { order })
        },
        OutcomeDecision::Conflict => {
            warn!("🗃️ Order {order_number} is {} and cannot accept {outcome:?}", order.status);
            Err(OrderManagementError::AlreadyTerminal { order_number: order_number.clone(), status: order.status })
        },
    }
}

pub async fn advance_status(
    order_number: &OrderNumber,
    new_status: OrderStatusType,
    actor: &str,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<OutcomeApplied, OrderManagementError> {
    let order =
        lock_order(order_number, conn).await?.ok_or_else(|| OrderManagementError::OrderNotFound(order_number.clone()))?;
    match decide_fulfilment(order.status, new_status) {
        FulfilmentDecision::Advance => Ok(transition(order, new_status, actor, note, conn).await?),
        FulfilmentDecision::Replay => Ok(OutcomeApplied::Replayed { order }),
        FulfilmentDecision::Illegal => Err(OrderManagementError::IllegalTransition {
            order_number: order_number.clone(),
            from: order.status,
            to: new_status,
        }),
    }
}
