//! The thin cart service in front of checkout.
use std::fmt::Debug;

use log::*;

use crate::{
    api::order_objects::CartView,
    db_types::{ActorContext, Cart, CartItem, CartSnapshot},
    traits::{CartError, CartManagement},
};

pub struct CartApi<B> {
    db: B,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn view(&self, owner: &ActorContext) -> Result<CartView, CartError> {
        let items = self.db.fetch_cart_items(owner).await?;
        Ok(CartView::new(&items))
    }

    pub async fn add_item(&self, owner: &ActorContext, variant_id: i64, quantity: i64) -> Result<CartItem, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let item = self.db.add_cart_item(owner, variant_id, quantity).await?;
        debug!("🛒️ {owner} now has {} of variant {variant_id}", item.quantity);
        Ok(item)
    }

    pub async fn update_item(
        &self,
        owner: &ActorContext,
        variant_id: i64,
        quantity: i64,
    ) -> Result<CartItem, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        self.db.update_cart_item(owner, variant_id, quantity).await
    }

    pub async fn remove_item(&self, owner: &ActorContext, variant_id: i64) -> Result<(), CartError> {
        self.db.remove_cart_item(owner, variant_id).await?;
        debug!("🛒️ Variant {variant_id} removed from {owner}'s cart");
        Ok(())
    }

    /// The frozen copy of the cart that checkout consumes
    pub async fn snapshot(&self, owner: &ActorContext) -> Result<Option<CartSnapshot>, CartError> {
        self.db.fetch_cart_snapshot(owner).await
    }

    /// Called after login, to carry the anonymous cart over to the user
    pub async fn merge_session_cart(&self, session_key: &str, user_id: &str) -> Result<Cart, CartError> {
        let cart = self.db.merge_carts(session_key, user_id).await?;
        info!("🛒️ Session cart merged into cart #{} for user {user_id}", cart.id);
        Ok(cart)
    }
}
