use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::json;
use storefront_engine::{
    db_types::{ActorContext, Cart},
    CartApi,
};

use super::{
    helpers::{get_request, post_request, Caller},
    mocks::MockStore,
};
use crate::routes::{CartAddItemRoute, CartMergeRoute, CartRoute};

#[actix_web::test]
async fn cart_without_identity() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&Caller::anonymous(), "/cart", |cfg| configure(cfg, MockStore::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"No user or session identity was supplied"}"#);
}

#[actix_web::test]
async fn empty_guest_cart() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_fetch_cart_items()
        .withf(|owner| owner == &ActorContext::session("guest-42"))
        .returning(|_| Ok(vec![]));
    let (status, body) = get_request(&Caller::session("guest-42"), "/cart", |cfg| configure(cfg, store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"lines":[],"subtotal":0,"item_count":0}"#);
}

#[actix_web::test]
async fn add_zero_items() {
    let _ = env_logger::try_init().ok();
    // Rejected before the store is touched
    let body = json!({"variant_id": 3, "quantity": 0});
    let (status, body) =
        post_request(&Caller::user("alice"), "/cart/items", &body, |cfg| configure(cfg, MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Quantity must be at least 1"), "{body}");
}

#[actix_web::test]
async fn merge_needs_user_and_session() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        post_request(&Caller::user("alice"), "/cart/merge", &json!({}), |cfg| configure(cfg, MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn merge_guest_cart_on_sign_in() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_merge_carts().withf(|session, user| session == "guest-42" && user == "alice").times(1).returning(
        |_, user| {
            let now = chrono::Utc::now();
            Ok(Cart { id: 1, user_id: Some(user.to_string()), session_key: None, created_at: now, updated_at: now })
        },
    );
    store.expect_fetch_cart_items().withf(|owner| owner == &ActorContext::user("alice")).returning(|_| Ok(vec![]));
    let caller = Caller::user("alice").with_session("guest-42");
    let (status, _) = post_request(&caller, "/cart/merge", &json!({}), |cfg| configure(cfg, store)).await;
    assert_eq!(status, StatusCode::OK);
}

fn configure(cfg: &mut ServiceConfig, store: MockStore) {
    let cart_api = CartApi::new(store);
    cfg.service(CartRoute::<MockStore>::new())
        .service(CartAddItemRoute::<MockStore>::new())
        .service(CartMergeRoute::<MockStore>::new())
        .app_data(web::Data::new(cart_api));
}
