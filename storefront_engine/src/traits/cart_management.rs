use thiserror::Error;

use crate::{
    db_types::{ActorContext, Cart, CartItem, CartSnapshot},
    traits::data_objects::CartItemDetail,
};

#[derive(Debug, Clone, Error)]
pub enum CartError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),
    #[error("Product variant {0} does not exist or is not for sale")]
    VariantNotFound(i64),
    #[error("Only {available} of variant {variant_id} in stock, {requested} requested")]
    InsufficientStock { variant_id: i64, requested: i64, available: i64 },
    #[error("Variant {0} is not in the cart")]
    ItemNotFound(i64),
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Shopping carts keyed by their owner. Quantities are checked against live stock when they change, but nothing is
/// reserved until checkout.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    async fn fetch_or_create_cart(&self, owner: &ActorContext) -> Result<Cart, CartError>;

    async fn fetch_cart_items(&self, owner: &ActorContext) -> Result<Vec<CartItemDetail>, CartError>;

    /// Adds `quantity` units of the variant, on top of any already in the cart. The unit price is captured now.
    async fn add_cart_item(&self, owner: &ActorContext, variant_id: i64, quantity: i64)
        -> Result<CartItem, CartError>;

    /// Replaces the quantity of a line already in the cart
    async fn update_cart_item(
        &self,
        owner: &ActorContext,
        variant_id: i64,
        quantity: i64,
    ) -> Result<CartItem, CartError>;

    async fn remove_cart_item(&self, owner: &ActorContext, variant_id: i64) -> Result<(), CartError>;

    /// An immutable copy of the owner's cart, or `None` if the owner has no cart yet
    async fn fetch_cart_snapshot(&self, owner: &ActorContext) -> Result<Option<CartSnapshot>, CartError>;

    /// Moves an anonymous session's cart into the user's cart after login. Quantities of shared variants are summed
    /// and capped at the available stock. The session cart is removed.
    async fn merge_carts(&self, session_key: &str, user_id: &str) -> Result<Cart, CartError>;
}
