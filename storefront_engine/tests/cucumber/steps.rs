use cucumber::{then, when};
use serde_json::json;
use storefront_engine::{
    db_types::{OrderStatusType, PaymentOutcome},
    gateways::{PaymentGateway, PushPaymentParams},
    traits::{GatewayCallResult, PushPaymentAccepted, ReconcileOutcome},
    CommitRejection,
    InventoryManagement,
    OrderFlowError,
    OrderManagement,
};

use crate::{
    cucumber::{storefront_world::customer, StorefrontWorld},
    support::{age_pending_orders, stk_callback},
};

#[when(expr = "'{word}' checks out")]
async fn check_out(world: &mut StorefrontWorld, name: String) {
    let system = world.system();
    let result = system
        .flow
        .commit(&customer(&name), &system.store.station_delivery(), None)
        .await
        .map(|c| c.order.order_number);
    world.checkouts.insert(name, result);
}

#[then(expr = "the checkout of '{word}' succeeds")]
async fn checkout_succeeded(world: &mut StorefrontWorld, name: String) {
    let _ = world.order_of(&name);
}

#[then(expr = "the checkout of '{word}' is rejected for insufficient stock")]
async fn checkout_rejected(world: &mut StorefrontWorld, name: String) {
    let result = world.checkouts.get(&name).expect("No checkout recorded");
    assert!(
        matches!(result, Err(OrderFlowError::Rejected(CommitRejection::InsufficientStock { .. }))),
        "Unexpected checkout result: {result:?}"
    );
}

#[then(expr = "there are {int} of '{word}' in stock")]
async fn stock_level(world: &mut StorefrontWorld, quantity: i64, sku: String) {
    let system = world.system();
    let id = system.store.variant(&sku).id;
    let variant = system.db.fetch_variant(id).await.expect("Error fetching variant").expect("No such variant");
    assert_eq!(variant.stock_quantity, quantity);
}

#[when(expr = "'{word}' pays by phone '{word}' and the provider accepts it as '{word}'")]
async fn pay_by_phone(world: &mut StorefrontWorld, name: String, phone: String, correlation_id: String) {
    let order_number = world.order_of(&name);
    let system = world.system();
    system.push_client.push_response(GatewayCallResult::Success(PushPaymentAccepted {
        correlation_id: correlation_id.clone(),
        customer_message: None,
        raw: json!({ "CheckoutRequestID": correlation_id }),
    }));
    let order = system.db.fetch_order_by_number(&order_number).await.unwrap().expect("Order not found");
    let params = PushPaymentParams { phone_number: phone, supersede: false };
    let result = system.push.initiate(&order, params).await;
    world.last_error = result.err().map(|e| e.to_string());
}

#[when(expr = "the provider reports success for '{word}' with receipt '{word}'")]
async fn callback_success(world: &mut StorefrontWorld, correlation_id: String, receipt: String) {
    deliver_callback(world, stk_callback(&correlation_id, 0, Some(&receipt))).await;
}

#[when(expr = "the provider reports failure for '{word}'")]
async fn callback_failure(world: &mut StorefrontWorld, correlation_id: String) {
    deliver_callback(world, stk_callback(&correlation_id, 1032, None)).await;
}

async fn deliver_callback(world: &mut StorefrontWorld, raw: Vec<u8>) {
    let system = world.system();
    let event = system.push.translate_callback(&raw).expect("Callback could not be read");
    let outcome = system.reconciliation.process(event).await.expect("Reconciliation failed");
    world.last_outcome = Some(outcome);
}

#[then(expr = "the callback is {word}")]
async fn callback_outcome(world: &mut StorefrontWorld, expected: String) {
    let outcome = world.last_outcome.as_ref().expect("No callback delivered");
    let matched = match expected.as_str() {
        "applied" => matches!(outcome, ReconcileOutcome::Applied { .. }),
        "replayed" => matches!(outcome, ReconcileOutcome::Replayed { .. }),
        "unmatched" => matches!(outcome, ReconcileOutcome::Unmatched { .. }),
        "conflicting" => matches!(outcome, ReconcileOutcome::Conflict { .. }),
        other => panic!("Unknown callback outcome {other}"),
    };
    assert!(matched, "Expected {expected}, got {outcome:?}");
}

#[when(expr = "'{word}' abandons their order")]
async fn abandon(world: &mut StorefrontWorld, name: String) {
    let order_number = world.order_of(&name);
    world.system().flow.cancel_own_order(&customer(&name), &order_number, "changed my mind").await.unwrap();
}

#[when("unpaid orders expire")]
async fn expire(world: &mut StorefrontWorld) {
    let system = world.system();
    age_pending_orders(&system.db, 3).await;
    system.flow.expire_stale_orders(chrono::Duration::hours(48)).await.expect("Expiry sweep failed");
}

#[when(expr = "staff move the order of '{word}' to {word}")]
async fn advance(world: &mut StorefrontWorld, name: String, status: String) {
    let order_number = world.order_of(&name);
    let status = status.parse::<OrderStatusType>().expect("Not a valid order status");
    let result = world.system().flow.advance_status(&order_number, status, "staff:carol", None).await;
    world.last_error = result.err().map(|e| e.to_string());
}

#[when(expr = "the payment for '{word}' is confirmed again")]
async fn confirm_again(world: &mut StorefrontWorld, name: String) {
    let order_number = world.order_of(&name);
    let result = world.system().flow.apply_payment_outcome(&order_number, &PaymentOutcome::Succeeded, "admin:dave").await;
    world.last_error = result.err().map(|e| e.to_string());
}

#[then("the request is refused")]
async fn refused(world: &mut StorefrontWorld) {
    assert!(world.last_error.is_some(), "The request should have failed");
}

#[then("the request succeeds")]
async fn succeeded(world: &mut StorefrontWorld) {
    assert!(world.last_error.is_none(), "Unexpected failure: {:?}", world.last_error);
}

#[then(expr = "the order of '{word}' is {word}")]
async fn order_status(world: &mut StorefrontWorld, name: String, status: String) {
    let order_number = world.order_of(&name);
    let expected = status.parse::<OrderStatusType>().expect("Not a valid order status");
    let order = world.system().db.fetch_order_by_number(&order_number).await.unwrap().expect("Order not found");
    assert_eq!(order.status, expected);
}

#[then(expr = "the order of '{word}' has {int} status events")]
async fn history_length(world: &mut StorefrontWorld, name: String, count: usize) {
    let order_number = world.order_of(&name);
    let system = world.system();
    let order = system.db.fetch_order_by_number(&order_number).await.unwrap().expect("Order not found");
    let history = system.db.fetch_order_history(order.id).await.unwrap();
    assert_eq!(history.len(), count);
}
