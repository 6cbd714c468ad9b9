use thiserror::Error;

use crate::db_types::{NewVariant, ProductVariant};

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Insufficient stock for variant {variant_id}. {requested} requested, {available} available")]
    InsufficientStock { variant_id: i64, requested: i64, available: i64 },
    #[error("Product variant {0} does not exist or is not for sale")]
    UnknownVariant(i64),
    #[error("A variant with SKU {0} already exists")]
    DuplicateSku(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Catalogue stock administration. Checkout reservations do not go through this trait; they happen inside the order
/// commit transaction.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    async fn insert_variant(&self, variant: NewVariant) -> Result<ProductVariant, InventoryError>;

    async fn fetch_variant(&self, variant_id: i64) -> Result<Option<ProductVariant>, InventoryError>;

    /// Sets the on-hand quantity for a variant, e.g. after a stock take or a delivery from a supplier.
    async fn set_stock(&self, variant_id: i64, quantity: i64) -> Result<ProductVariant, InventoryError>;
}
