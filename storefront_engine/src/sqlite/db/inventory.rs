//! The inventory guard.
//!
//! Stock only ever leaves `product_variants` through [`reserve`], and only inside the transaction that commits the
//! order the stock is for.
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{CartLine, NewVariant, ProductVariant},
    sqlite::db::is_unique_violation,
    traits::InventoryError,
};

/// A cart line whose stock has been taken, together with the variant as it was after the decrement.
#[derive(Debug, Clone)]
pub struct ReservedLine {
    pub line: CartLine,
    pub variant: ProductVariant,
}

/// Takes stock for every line, or fails on the first line that cannot be met.
///
/// This is not atomic on its own. Call it inside the order commit transaction so that a failure part-way through rolls
/// back the lines that were already decremented. Lines are processed in variant id order.
pub async fn reserve(lines: &[CartLine], conn: &mut SqliteConnection) -> Result<Vec<ReservedLine>, InventoryError> {
    let mut sorted = lines.to_vec();
    sorted.sort_by_key(|l| l.variant_id);
    let mut reserved = Vec::with_capacity(sorted.len());
    for line in sorted {
        if line.quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(line.quantity));
        }
        let variant = decrement_stock(line.variant_id, line.quantity, conn).await?;
        trace!("🗃️ Reserved {} of variant {}. {} left", line.quantity, line.variant_id, variant.stock_quantity);
        reserved.push(ReservedLine { line, variant });
    }
    Ok(reserved)
}

async fn decrement_stock(
    variant_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<ProductVariant, InventoryError> {
    let updated: Option<ProductVariant> = sqlx::query_as(
        r#"
            UPDATE product_variants
            SET stock_quantity = stock_quantity - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND is_active AND stock_quantity >= $1
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(variant_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(variant) => Ok(variant),
        None => match fetch_variant(variant_id, conn).await? {
            Some(v) if v.is_active => {
                debug!("🗃️ Variant {variant_id} has {} in stock. {quantity} requested", v.stock_quantity);
                Err(InventoryError::InsufficientStock { variant_id, requested: quantity, available: v.stock_quantity })
            },
            _ => Err(InventoryError::UnknownVariant(variant_id)),
        },
    }
}

pub async fn fetch_variant(variant_id: i64, conn: &mut SqliteConnection) -> Result<Option<ProductVariant>, sqlx::Error> {
    let variant =
        sqlx::query_as("SELECT * FROM product_variants WHERE id = $1").bind(variant_id).fetch_optional(conn).await?;
    Ok(variant)
}

pub async fn fetch_variants_in_cart(
    cart_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ProductVariant>, sqlx::Error> {
    let variants = sqlx::query_as(
        "SELECT * FROM product_variants WHERE id IN (SELECT variant_id FROM cart_items WHERE cart_id = $1)",
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await?;
    Ok(variants)
}

pub async fn insert_variant(variant: NewVariant, conn: &mut SqliteConnection) -> Result<ProductVariant, InventoryError> {
    if variant.stock_quantity < 0 {
        return Err(InventoryError::InvalidQuantity(variant.stock_quantity));
    }
    let sku = variant.sku.clone();
    let result = sqlx::query_as(
        r#"
            INSERT INTO product_variants (sku, name, variant_details, price, stock_quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(variant.sku)
    .bind(variant.name)
    .bind(variant.variant_details)
    .bind(variant.price)
    .bind(variant.stock_quantity)
    .fetch_one(conn)
    .await;
    match result {
        Ok(v) => Ok(v),
        Err(e) if is_unique_violation(&e) => Err(InventoryError::DuplicateSku(sku)),
        Err(e) => Err(e.into()),
    }
}

pub async fn set_stock(
    variant_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<ProductVariant, InventoryError> {
    if quantity < 0 {
        return Err(InventoryError::InvalidQuantity(quantity));
    }
    let variant: Option<ProductVariant> = sqlx::query_as(
        "UPDATE product_variants SET stock_quantity = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(quantity)
    .bind(variant_id)
    .fetch_optional(conn)
    .await?;
    variant.ok_or(InventoryError::UnknownVariant(variant_id))
}
