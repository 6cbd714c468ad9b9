use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::{json, Value};
use storefront_engine::{
    db_types::{ActorContext, CartLine, CartSnapshot, DeliveryType, Money, OrderStatusType, ResolvedDelivery},
    events::EventProducers,
    traits::{DeliveryError, OrderManagementError},
    OrderFlowApi,
};

use super::{
    helpers::{order_for, post_request, Caller},
    mocks::MockStore,
};
use crate::routes::{CheckoutQuoteRoute, CheckoutRoute};

fn station_delivery() -> Value {
    json!({
        "delivery": {
            "selection": {"type": "station", "station_id": 4},
            "shipping_phone": "0712345678"
        },
        "customer_notes": "  Leave at reception "
    })
}

fn snapshot(owner: &ActorContext) -> CartSnapshot {
    CartSnapshot {
        cart_id: 3,
        owner: owner.clone(),
        lines: vec![
            CartLine { variant_id: 1, quantity: 2, unit_price: Money::from(1_000_00) },
            CartLine { variant_id: 2, quantity: 1, unit_price: Money::from(1_000_00) },
        ],
    }
}

fn westlands() -> ResolvedDelivery {
    ResolvedDelivery {
        delivery_type: DeliveryType::Domestic,
        station_id: Some(4),
        zone_id: None,
        fee: Money::from(200_00),
        shipping_address: "Westlands, Sarit Centre, Ground Floor".to_string(),
        shipping_phone: "0712345678".to_string(),
    }
}

#[actix_web::test]
async fn checkout_commits_a_pending_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_cart_snapshot().returning(|owner| Ok(Some(snapshot(owner))));
    store.expect_resolve_delivery().returning(|_| Ok(westlands()));
    store
        .expect_commit_order()
        .withf(|order| {
            order.owner == ActorContext::user("alice") &&
                order.lines.len() == 2 &&
                order.customer_notes.as_deref() == Some("Leave at reception") &&
                order.currency == "KES"
        })
        .times(1)
        .returning(|order| Ok((order_for("alice", order.order_number.as_str(), OrderStatusType::Pending), vec![])));
    let (status, body) =
        post_request(&Caller::user("alice"), "/checkout", &station_delivery(), |cfg| configure(cfg, store)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let committed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(committed["order"]["status"], "pending");
    assert_eq!(committed["order"]["total_amount"], 3_200_00);
}

#[actix_web::test]
async fn checkout_with_insufficient_stock() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_cart_snapshot().returning(|owner| Ok(Some(snapshot(owner))));
    store.expect_resolve_delivery().returning(|_| Ok(westlands()));
    store
        .expect_commit_order()
        .times(1)
        .returning(|_| Err(OrderManagementError::InsufficientStock { variant_id: 2, requested: 1, available: 0 }));
    let (status, body) =
        post_request(&Caller::user("alice"), "/checkout", &station_delivery(), |cfg| configure(cfg, store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let err: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["variant_id"], 2);
    assert_eq!(err["requested"], 1);
    assert_eq!(err["available"], 0);
}

#[actix_web::test]
async fn checkout_of_an_already_ordered_cart() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_cart_snapshot().returning(|owner| Ok(Some(snapshot(owner))));
    store.expect_resolve_delivery().returning(|_| Ok(westlands()));
    store.expect_commit_order().times(1).returning(|_| Err(OrderManagementError::CartChanged(1)));
    let (status, body) =
        post_request(&Caller::user("alice"), "/checkout", &station_delivery(), |cfg| configure(cfg, store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("The cart changed during checkout"), "{body}");
}

#[actix_web::test]
async fn checkout_with_empty_cart() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_cart_snapshot().returning(|_| Ok(None));
    let (status, body) =
        post_request(&Caller::session("guest-1"), "/checkout", &station_delivery(), |cfg| configure(cfg, store))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("The cart is empty"), "{body}");
}

#[actix_web::test]
async fn checkout_with_missing_shipping_details() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_cart_snapshot().returning(|owner| Ok(Some(snapshot(owner))));
    store
        .expect_resolve_delivery()
        .returning(|_| Err(DeliveryError::MissingShippingDetails("A contact phone number is required".into())));
    store.expect_commit_order().never();
    let (status, _) =
        post_request(&Caller::user("alice"), "/checkout", &station_delivery(), |cfg| configure(cfg, store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn quote_includes_delivery_fee() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_cart_snapshot().returning(|owner| Ok(Some(snapshot(owner))));
    store.expect_resolve_delivery().returning(|_| Ok(westlands()));
    store.expect_commit_order().never();
    let (status, body) =
        post_request(&Caller::user("alice"), "/checkout/quote", &station_delivery(), |cfg| configure(cfg, store))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"subtotal":300000,"delivery_fee":20000,"total":320000}"#);
}

fn configure(cfg: &mut ServiceConfig, store: MockStore) {
    let api = OrderFlowApi::new(store, EventProducers::default()).with_currency("KES");
    cfg.service(CheckoutRoute::<MockStore>::new())
        .service(CheckoutQuoteRoute::<MockStore>::new())
        .app_data(web::Data::new(api));
}
