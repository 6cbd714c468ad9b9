use cucumber::given;
use storefront_engine::test_utils::seed::fill_cart;

use crate::cucumber::{
    storefront_world::{customer, StorefrontSystem},
    StorefrontWorld,
};

#[given("a fresh store")]
async fn fresh_store(world: &mut StorefrontWorld) {
    let system = StorefrontSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "'{word}' has {int} of '{word}' in their cart")]
async fn cart_contains(world: &mut StorefrontWorld, name: String, quantity: i64, sku: String) {
    let system = world.system();
    let variant_id = system.store.variant(&sku).id;
    fill_cart(&system.db, &customer(&name), &[(variant_id, quantity)]).await;
}
