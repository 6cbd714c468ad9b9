use std::collections::HashMap;

use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{ActorContext, Cart, CartItem, CartLine, CartSnapshot, Money},
    sqlite::db::inventory,
    traits::{CartError, CartItemDetail, OrderManagementError},
};

pub async fn fetch_cart(owner: &ActorContext, conn: &mut SqliteConnection) -> Result<Option<Cart>, sqlx::Error> {
    let cart = sqlx::query_as("SELECT * FROM carts WHERE user_id IS $1 AND session_key IS $2")
        .bind(owner.user_id())
        .bind(owner.session_key())
        .fetch_optional(conn)
        .await?;
    Ok(cart)
}

/// Carts are created lazily. The insert goes first so that the enclosing transaction holds the write lock from the
/// start.
pub async fn fetch_or_create_cart(owner: &ActorContext, conn: &mut SqliteConnection) -> Result<Cart, sqlx::Error> {
    let result = sqlx::query("INSERT OR IGNORE INTO carts (user_id, session_key) VALUES ($1, $2)")
        .bind(owner.user_id())
        .bind(owner.session_key())
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() > 0 {
        debug!("🗃️ New cart created for {owner}");
    }
    let cart = sqlx::query_as("SELECT * FROM carts WHERE user_id IS $1 AND session_key IS $2")
        .bind(owner.user_id())
        .bind(owner.session_key())
        .fetch_one(conn)
        .await?;
    Ok(cart)
}

pub async fn fetch_items(cart_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY added_at, id")
        .bind(cart_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_item(
    cart_id: i64,
    variant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<CartItem>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM cart_items WHERE cart_id = $1 AND variant_id = $2")
        .bind(cart_id)
        .bind(variant_id)
        .fetch_optional(conn)
        .await?;
    Ok(item)
}

pub async fn fetch_item_details(cart_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartItemDetail>, CartError> {
    let items = fetch_items(cart_id, conn).await?;
    let mut variants =
        inventory::fetch_variants_in_cart(cart_id, conn).await?.into_iter().map(|v| (v.id, v)).collect::<HashMap<_, _>>();
    let details = items
        .into_iter()
        .filter_map(|item| variants.remove(&item.variant_id).map(|variant| CartItemDetail { item, variant }))
        .collect();
    Ok(details)
}

pub async fn fetch_snapshot(owner: &ActorContext, conn: &mut SqliteConnection) -> Result<Option<CartSnapshot>, CartError> {
    let Some(cart) = fetch_cart(owner, conn).await? else {
        return Ok(None);
    };
    let lines = fetch_items(cart.id, conn).await?.iter().map(CartLine::from).collect();
    Ok(Some(CartSnapshot { cart_id: cart.id, owner: owner.clone(), lines }))
}

/// Checks the requested quantity against live stock and returns the current price of the variant.
async fn check_stock(
    variant_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Money, CartError> {
    let variant = inventory::fetch_variant(variant_id, conn)
        .await?
        .filter(|v| v.is_active)
        .ok_or(CartError::VariantNotFound(variant_id))?;
    if quantity > variant.stock_quantity {
        return Err(CartError::InsufficientStock { variant_id, requested: quantity, available: variant.stock_quantity });
    }
    Ok(variant.price)
}

pub async fn add_item(
    owner: &ActorContext,
    variant_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<CartItem, CartError> {
    if quantity < 1 {
        return Err(CartError::InvalidQuantity(quantity));
    }
    let cart = fetch_or_create_cart(owner, conn).await?;
    let existing = fetch_item(cart.id, variant_id, conn).await?.map(|i| i.quantity).unwrap_or(0);
    let price = check_stock(variant_id, existing + quantity, conn).await?;
    let item = sqlx::query_as(
        r#"
            INSERT INTO cart_items (cart_id, variant_id, quantity, unit_price) VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, variant_id) DO UPDATE SET quantity = quantity + excluded.quantity
            RETURNING *;
        "#,
    )
    .bind(cart.id)
    .bind(variant_id)
    .bind(quantity)
    .bind(price)
    .fetch_one(&mut *conn)
    .await?;
    touch_cart(cart.id, conn).await?;
    trace!("🗃️ Added {quantity} of variant {variant_id} to cart {}", cart.id);
    Ok(item)
}

pub async fn update_item(
    owner: &ActorContext,
    variant_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<CartItem, CartError> {
    if quantity < 1 {
        return Err(CartError::InvalidQuantity(quantity));
    }
    let cart = fetch_or_create_cart(owner, conn).await?;
    fetch_item(cart.id, variant_id, conn).await?.ok_or(CartError::ItemNotFound(variant_id))?;
    check_stock(variant_id, quantity, conn).await?;
    let item = sqlx::query_as(
        "UPDATE cart_items SET quantity = $1 WHERE cart_id = $2 AND variant_id = $3 RETURNING *",
    )
    .bind(quantity)
    .bind(cart.id)
    .bind(variant_id)
    .fetch_one(&mut *conn)
    .await?;
    touch_cart(cart.id, conn).await?;
    Ok(item)
}

pub async fn remove_item(owner: &ActorContext, variant_id: i64, conn: &mut SqliteConnection) -> Result<(), CartError> {
    let cart = fetch_cart(owner, conn).await?.ok_or(CartError::ItemNotFound(variant_id))?;
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND variant_id = $2")
        .bind(cart.id)
        .bind(variant_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CartError::ItemNotFound(variant_id));
    }
    Ok(())
}

/// Removes exactly the quantities an order was committed for. Items added after the snapshot was taken stay in the
/// cart. The cart itself is deleted once it is empty.
///
/// Every line must still be in the cart with at least the committed quantity. If another checkout consumed the cart
/// first, this fails with `CartChanged` and the enclosing transaction is rolled back.
pub async fn consume_lines(
    cart_id: i64,
    lines: &[CartLine],
    conn: &mut SqliteConnection,
) -> Result<(), OrderManagementError> {
    for line in lines {
        let in_cart: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM cart_items WHERE cart_id = $1 AND variant_id = $2")
                .bind(cart_id)
                .bind(line.variant_id)
                .fetch_optional(&mut *conn)
                .await?;
        if in_cart.map_or(true, |q| q < line.quantity) {
            debug!("🗃️ Cart {cart_id} no longer holds {} of variant {}", line.quantity, line.variant_id);
            return Err(OrderManagementError::CartChanged(cart_id));
        }
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND variant_id = $2 AND quantity <= $3")
            .bind(cart_id)
            .bind(line.variant_id)
            .bind(line.quantity)
            .execute(&mut *conn)
            .await?;
        sqlx::query("UPDATE cart_items SET quantity = quantity - $1 WHERE cart_id = $2 AND variant_id = $3")
            .bind(line.quantity)
            .bind(cart_id)
            .bind(line.variant_id)
            .execute(&mut *conn)
            .await?;
    }
    let deleted =
        sqlx::query("DELETE FROM carts WHERE id = $1 AND NOT EXISTS (SELECT 1 FROM cart_items WHERE cart_id = $1)")
            .bind(cart_id)
            .execute(conn)
            .await?;
    if deleted.rows_affected() > 0 {
        trace!("🗃️ Cart {cart_id} is empty and has been removed");
    }
    Ok(())
}

/// Folds the session cart into the user's cart. Quantities are summed and capped at live stock.
pub async fn merge(session_key: &str, user_id: &str, conn: &mut SqliteConnection) -> Result<Cart, CartError> {
    let user = ActorContext::user(user_id);
    let user_cart = fetch_or_create_cart(&user, conn).await?;
    let Some(session_cart) = fetch_cart(&ActorContext::session(session_key), conn).await? else {
        return Ok(user_cart);
    };
    for item in fetch_items(session_cart.id, conn).await? {
        let Some(variant) = inventory::fetch_variant(item.variant_id, conn).await?.filter(|v| v.is_active) else {
            continue;
        };
        let existing = fetch_item(user_cart.id, item.variant_id, conn).await?;
        let wanted = existing.as_ref().map(|i| i.quantity).unwrap_or(0) + item.quantity;
        let quantity = wanted.min(variant.stock_quantity);
        if quantity < 1 {
            continue;
        }
        sqlx::query(
            r#"
                INSERT INTO cart_items (cart_id, variant_id, quantity, unit_price) VALUES ($1, $2, $3, $4)
                ON CONFLICT (cart_id, variant_id) DO UPDATE SET quantity = excluded.quantity
            "#,
        )
        .bind(user_cart.id)
        .bind(item.variant_id)
        .bind(quantity)
        .bind(item.unit_price)
        .execute(&mut *conn)
        .await?;
    }
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(session_cart.id).execute(&mut *conn).await?;
    sqlx::query("DELETE FROM carts WHERE id = $1").bind(session_cart.id).execute(&mut *conn).await?;
    debug!("🗃️ Session cart {} merged into cart {} for user {user_id}", session_cart.id, user_cart.id);
    Ok(user_cart)
}

async fn touch_cart(cart_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE carts SET updated_at = CURRENT_TIMESTAMP WHERE id = $1").bind(cart_id).execute(conn).await?;
    Ok(())
}
