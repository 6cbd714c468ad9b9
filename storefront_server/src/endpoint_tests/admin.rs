use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::{json, Value};
use storefront_engine::{
    db_types::{OrderNumber, OrderStatusType},
    events::EventProducers,
    traits::{OrderManagementError, OutcomeApplied},
    ExchangeRateApi,
    InventoryApi,
    OrderFlowApi,
    OrderQueryApi,
};

use super::{
    helpers::{get_request, order_for, post_request, Caller},
    mocks::MockStore,
};
use crate::routes::{
    AdminCancelOrderRoute,
    AdminOrderRoute,
    AdminOrderStatusRoute,
    SetStockRoute,
    UpdateExchangeRateRoute,
};

const ORDER: &str = "ORD-20241002-7QK3ZD";

#[derive(Default)]
struct Stores {
    queries: Option<MockStore>,
    flow: Option<MockStore>,
    rates: Option<MockStore>,
    inventory: Option<MockStore>,
}

#[actix_web::test]
async fn admin_routes_need_a_role() {
    let _ = env_logger::try_init().ok();
    let path = format!("/admin/orders/{ORDER}");
    let (status, body) = get_request(&Caller::user("alice"), &path, |cfg| configure(cfg, Stores::default())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Insufficient Permissions"), "{body}");
}

#[actix_web::test]
async fn admin_routes_need_an_identity() {
    let _ = env_logger::try_init().ok();
    let path = format!("/admin/orders/{ORDER}");
    let caller = Caller::anonymous().with_roles("admin");
    let (status, _) = get_request(&caller, &path, |cfg| configure(cfg, Stores::default())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn staff_can_see_any_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_fetch_order_by_number()
        .returning(|n| Ok(Some(order_for("bob", n.as_str(), OrderStatusType::Processing))));
    store.expect_fetch_order_items().returning(|_| Ok(vec![]));
    store.expect_fetch_order_history().returning(|_| Ok(vec![]));
    store.expect_fetch_payments_for_subject().returning(|_| Ok(vec![]));
    let path = format!("/admin/orders/{ORDER}");
    let caller = Caller::user("sam").with_roles("staff");
    let stores = Stores { queries: Some(store), ..Default::default() };
    let (status, body) = get_request(&caller, &path, |cfg| configure(cfg, stores)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let detail: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(detail["order"]["user_id"], "bob");
}

#[actix_web::test]
async fn staff_cannot_cancel_orders() {
    let _ = env_logger::try_init().ok();
    let path = format!("/admin/orders/{ORDER}/cancel");
    let caller = Caller::user("sam").with_roles("staff");
    let (status, _) = post_request(&caller, &path, &json!({}), |cfg| configure(cfg, Stores::default())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_cancels_an_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_apply_payment_outcome()
        .withf(|n, outcome, actor| {
            n == &OrderNumber::from(ORDER) && !outcome.is_success() && actor == "user:root"
        })
        .times(1)
        .returning(|n, _, _| {
            Ok(OutcomeApplied::Transitioned {
                old_status: OrderStatusType::Pending,
                order: order_for("bob", n.as_str(), OrderStatusType::Cancelled),
            })
        });
    let path = format!("/admin/orders/{ORDER}/cancel");
    let caller = Caller::user("root").with_roles("admin");
    let stores = Stores { flow: Some(store), ..Default::default() };
    let (status, body) = post_request(&caller, &path, &json!({}), |cfg| configure(cfg, stores)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[actix_web::test]
async fn fulfilment_cannot_skip_steps() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_advance_order_status().returning(|n, to, _, _| {
        Err(OrderManagementError::IllegalTransition {
            order_number: n.clone(),
            from: OrderStatusType::Confirmed,
            to,
        })
    });
    let path = format!("/admin/orders/{ORDER}/status");
    let caller = Caller::user("sam").with_roles("staff");
    let stores = Stores { flow: Some(store), ..Default::default() };
    let body = json!({"status": "delivered"});
    let (status, body) = post_request(&caller, &path, &body, |cfg| configure(cfg, stores)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("cannot move from confirmed to delivered"), "{body}");
}

#[actix_web::test]
async fn set_exchange_rate() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_set_exchange_rate()
        .withf(|r| r.base_currency == "KES" && r.quote_currency == "USD" && r.rate == 7_800)
        .times(1)
        .returning(|_| Ok(()));
    let caller = Caller::user("root").with_roles("admin");
    let stores = Stores { rates: Some(store), ..Default::default() };
    let body = json!({"base_currency": "kes", "quote_currency": "usd", "rate": "0.0078"});
    let (status, body) = post_request(&caller, "/admin/exchange_rate", &body, |cfg| configure(cfg, stores)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["rate"], "0.007800");
}

#[actix_web::test]
async fn set_invalid_exchange_rate() {
    let _ = env_logger::try_init().ok();
    let caller = Caller::user("root").with_roles("admin");
    let body = json!({"base_currency": "KES", "quote_currency": "USD", "rate": "-1"});
    let (status, _) =
        post_request(&caller, "/admin/exchange_rate", &body, |cfg| configure(cfg, Stores::default())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn negative_stock_is_refused() {
    let _ = env_logger::try_init().ok();
    let caller = Caller::user("root").with_roles("admin");
    let body = json!({"quantity": -3});
    let (status, _) = post_request(&caller, "/admin/stock/5", &body, |cfg| configure(cfg, Stores::default())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn configure(cfg: &mut ServiceConfig, stores: Stores) {
    let query_api = OrderQueryApi::new(stores.queries.unwrap_or_default());
    let flow_api = OrderFlowApi::new(stores.flow.unwrap_or_default(), EventProducers::default());
    let rates_api = ExchangeRateApi::new(stores.rates.unwrap_or_default());
    let inventory_api = InventoryApi::new(stores.inventory.unwrap_or_default());
    cfg.service(AdminOrderRoute::<MockStore>::new())
        .service(AdminOrderStatusRoute::<MockStore>::new())
        .service(AdminCancelOrderRoute::<MockStore>::new())
        .service(UpdateExchangeRateRoute::<MockStore>::new())
        .service(SetStockRoute::<MockStore>::new())
        .app_data(web::Data::new(query_api))
        .app_data(web::Data::new(flow_api))
        .app_data(web::Data::new(rates_api))
        .app_data(web::Data::new(inventory_api));
}
