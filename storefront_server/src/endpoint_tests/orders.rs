use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::{json, Value};
use storefront_engine::{
    db_types::{OrderNumber, OrderStatusType, PaymentOutcome},
    events::EventProducers,
    traits::{OrderManagementError, OrderPage, OutcomeApplied},
    OrderFlowApi,
    OrderQueryApi,
};

use super::{
    helpers::{get_request, order_for, post_request, Caller},
    mocks::MockStore,
};
use crate::routes::{CancelMyOrderRoute, MyOrderRoute, MyOrdersRoute};

const ORDER: &str = "ORD-20241002-7QK3ZD";

#[actix_web::test]
async fn list_my_orders() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_fetch_orders_for_owner()
        .withf(|owner, page| owner.user_id() == Some("alice") && page.page == 2 && page.per_page == 100)
        .returning(|_, page| {
            Ok(OrderPage {
                orders: vec![order_for("alice", ORDER, OrderStatusType::Confirmed)],
                page: page.page,
                per_page: page.per_page,
                total_orders: 101,
            })
        });
    let path = "/orders?page=2&per_page=500";
    let (status, body) = get_request(&Caller::user("alice"), path, |cfg| configure(cfg, store, MockStore::new())).await;
    assert_eq!(status, StatusCode::OK);
    let page: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(page["total_orders"], 101);
    assert_eq!(page["orders"][0]["order_number"], ORDER);
}

#[actix_web::test]
async fn someone_elses_order_is_not_found() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_fetch_order_by_number()
        .returning(|n| Ok(Some(order_for("bob", n.as_str(), OrderStatusType::Pending))));
    let path = format!("/orders/{ORDER}");
    let (status, body) =
        get_request(&Caller::user("alice"), &path, |cfg| configure(cfg, store, MockStore::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, format!(r#"{{"error":"The data was not found. Order {ORDER} does not exist"}}"#));
}

#[actix_web::test]
async fn order_detail_for_owner() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_fetch_order_by_number()
        .returning(|n| Ok(Some(order_for("alice", n.as_str(), OrderStatusType::Confirmed))));
    store.expect_fetch_order_items().returning(|_| Ok(vec![]));
    store.expect_fetch_order_history().returning(|_| Ok(vec![]));
    store.expect_fetch_payments_for_subject().returning(|_| Ok(vec![]));
    let path = format!("/orders/{ORDER}");
    let (status, body) =
        get_request(&Caller::user("alice"), &path, |cfg| configure(cfg, store, MockStore::new())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let detail: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(detail["order"]["status"], "confirmed");
}

#[actix_web::test]
async fn cancel_my_pending_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_fetch_order_by_number()
        .returning(|n| Ok(Some(order_for("alice", n.as_str(), OrderStatusType::Pending))));
    store
        .expect_apply_payment_outcome()
        .withf(|n, outcome, actor| {
            n == &OrderNumber::from(ORDER) &&
                outcome == &PaymentOutcome::failed("Changed my mind") &&
                actor == "user:alice"
        })
        .times(1)
        .returning(|n, _, _| {
            Ok(OutcomeApplied::Transitioned {
                old_status: OrderStatusType::Pending,
                order: order_for("alice", n.as_str(), OrderStatusType::Cancelled),
            })
        });
    let path = format!("/orders/{ORDER}/cancel");
    let body = json!({"reason": "Changed my mind"});
    let (status, body) =
        post_request(&Caller::user("alice"), &path, &body, |cfg| configure(cfg, MockStore::new(), store)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let applied: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(applied["result"], "transitioned");
    assert_eq!(applied["order"]["status"], "cancelled");
}

#[actix_web::test]
async fn cancel_a_paid_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_fetch_order_by_number()
        .returning(|n| Ok(Some(order_for("alice", n.as_str(), OrderStatusType::Confirmed))));
    store.expect_apply_payment_outcome().returning(|n, _, _| {
        Err(OrderManagementError::IllegalTransition {
            order_number: n.clone(),
            from: OrderStatusType::Confirmed,
            to: OrderStatusType::Cancelled,
        })
    });
    let path = format!("/orders/{ORDER}/cancel");
    let (status, _) =
        post_request(&Caller::user("alice"), &path, &json!({}), |cfg| configure(cfg, MockStore::new(), store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

fn configure(cfg: &mut ServiceConfig, queries: MockStore, flow: MockStore) {
    let query_api = OrderQueryApi::new(queries);
    let flow_api = OrderFlowApi::new(flow, EventProducers::default());
    cfg.service(MyOrdersRoute::<MockStore>::new())
        .service(MyOrderRoute::<MockStore>::new())
        .service(CancelMyOrderRoute::<MockStore>::new())
        .app_data(web::Data::new(query_api))
        .app_data(web::Data::new(flow_api));
}
