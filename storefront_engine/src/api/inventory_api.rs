//! Catalogue stock administration. Checkout never goes through here; it reserves stock inside its own transaction.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewVariant, ProductVariant},
    traits::{InventoryError, InventoryManagement},
};

pub struct InventoryApi<B> {
    db: B,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn add_variant(&self, variant: NewVariant) -> Result<ProductVariant, InventoryError> {
        let variant = self.db.insert_variant(variant).await?;
        info!("📦️ Variant {} ({}) added with {} in stock", variant.id, variant.sku, variant.stock_quantity);
        Ok(variant)
    }

    pub async fn fetch_variant(&self, variant_id: i64) -> Result<Option<ProductVariant>, InventoryError> {
        self.db.fetch_variant(variant_id).await
    }

    /// Overwrites the stock level of a variant, e.g. after a stock take.
    pub async fn set_stock(&self, variant_id: i64, quantity: i64) -> Result<ProductVariant, InventoryError> {
        if quantity < 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        self.db.set_stock(variant_id, quantity).await
    }
}
