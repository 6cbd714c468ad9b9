use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::{json, Value};
use storefront_engine::{
    db_types::{OrderStatusType, PaymentMethod},
    events::EventProducers,
    gateways::{PushGatewayConfig, PushPaymentGateway},
    traits::{CallbackOutcome, GatewayCallResult, PushPaymentAccepted, ReconcileOutcome},
    OrderQueryApi,
    ReconciliationApi,
};

use super::{
    helpers::{order_for, post_raw, post_request, processing_payment, Caller},
    mocks::{MockPushClient, MockStore},
};
use crate::routes::{PushCallbackRoute, PushPaymentRoute};

const ORDER: &str = "ORD-20241002-7QK3ZD";

const SUCCESS_CALLBACK: &str = r#"{"Body":{"stkCallback":{"MerchantRequestID":"29115-34620561-1","CheckoutRequestID":"ws_CO_191220191020363925","ResultCode":0,"ResultDesc":"The service request is processed successfully.","CallbackMetadata":{"Item":[{"Name":"Amount","Value":3200.00},{"Name":"MpesaReceiptNumber","Value":"NLJ7RT61SV"},{"Name":"PhoneNumber","Value":254712345678}]}}}}"#;

fn owned_order_store() -> MockStore {
    let mut orders = MockStore::new();
    orders
        .expect_fetch_order_by_number()
        .returning(|n| Ok(Some(order_for("alice", n.as_str(), OrderStatusType::Pending))));
    orders
}

#[actix_web::test]
async fn push_payment_prompts_the_payer() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockStore::new();
    payments
        .expect_begin_payment_attempt()
        .withf(|p, supersede| p.method == PaymentMethod::Push && !*supersede)
        .times(1)
        .returning(|_, _| Ok(processing_payment(&order_for("alice", ORDER, OrderStatusType::Pending))));
    payments.expect_attach_correlation_id().withf(|_, cid, _| cid == "ws_CO_0001").times(1).returning(|_, cid, raw| {
        let mut p = processing_payment(&order_for("alice", ORDER, OrderStatusType::Pending));
        p.correlation_id = Some(cid.to_string());
        p.gateway_response = Some(raw);
        Ok(p)
    });
    let mut client = MockPushClient::new();
    client
        .expect_request_payment()
        .withf(|req| req.phone_number == "254712345678" && req.amount == 3200 && req.account_reference == ORDER)
        .times(1)
        .returning(|_| {
            GatewayCallResult::Success(PushPaymentAccepted {
                correlation_id: "ws_CO_0001".to_string(),
                customer_message: Some("Success. Request accepted for processing".to_string()),
                raw: json!({"ResponseCode": "0"}),
            })
        });
    let path = format!("/payments/push/{ORDER}");
    let body = json!({"phone_number": "0712 345 678"});
    let (status, body) = post_request(&Caller::user("alice"), &path, &body, |cfg| {
        configure(cfg, owned_order_store(), payments, client)
    })
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    let started: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(started["payment"]["status"], "processing");
    assert_eq!(started["customer_message"], "Success. Request accepted for processing");
    assert!(started.get("redirect_url").is_none());
}

#[actix_web::test]
async fn push_payment_rejected_by_provider() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockStore::new();
    payments
        .expect_begin_payment_attempt()
        .returning(|_, _| Ok(processing_payment(&order_for("alice", ORDER, OrderStatusType::Pending))));
    payments.expect_fail_payment_attempt().times(1).returning(|_, reason, _| {
        let mut p = processing_payment(&order_for("alice", ORDER, OrderStatusType::Pending));
        p.failure_reason = Some(reason.to_string());
        Ok(p)
    });
    let mut client = MockPushClient::new();
    client.expect_request_payment().returning(|_| GatewayCallResult::Rejected("Invalid PhoneNumber".to_string()));
    let path = format!("/payments/push/{ORDER}");
    let body = json!({"phone_number": "0712345678"});
    let (status, _) = post_request(&Caller::user("alice"), &path, &body, |cfg| {
        configure(cfg, owned_order_store(), payments, client)
    })
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[actix_web::test]
async fn push_payment_with_bad_phone_number() {
    let _ = env_logger::try_init().ok();
    let path = format!("/payments/push/{ORDER}");
    let body = json!({"phone_number": "not a phone"});
    let (status, _) = post_request(&Caller::user("alice"), &path, &body, |cfg| {
        configure(cfg, owned_order_store(), MockStore::new(), MockPushClient::new())
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn push_payment_for_someone_elses_order() {
    let _ = env_logger::try_init().ok();
    let path = format!("/payments/push/{ORDER}");
    let body = json!({"phone_number": "0712345678"});
    let (status, _) = post_request(&Caller::user("mallory"), &path, &body, |cfg| {
        configure(cfg, owned_order_store(), MockStore::new(), MockPushClient::new())
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn callback_is_reconciled() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockStore::new();
    payments
        .expect_reconcile_payment()
        .withf(|ev| {
            ev.correlation_id == "ws_CO_191220191020363925" &&
                ev.outcome == CallbackOutcome::Succeeded { receipt: Some("NLJ7RT61SV".to_string()) }
        })
        .times(1)
        .returning(|ev| Ok(ReconcileOutcome::Unmatched { correlation_id: ev.correlation_id.clone() }));
    let (status, body) = post_raw("/push", SUCCESS_CALLBACK, |cfg| configure_callbacks(cfg, payments)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ResultCode":0,"ResultDesc":"Accepted"}"#);
}

#[actix_web::test]
async fn unreadable_callback_is_still_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockStore::new();
    payments.expect_reconcile_payment().never();
    let (status, body) = post_raw("/push", r#"{"Body":{}}"#, |cfg| configure_callbacks(cfg, payments)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ResultCode":0,"ResultDesc":"Accepted"}"#);
}

fn configure(cfg: &mut ServiceConfig, orders: MockStore, payments: MockStore, client: MockPushClient) {
    let query_api = OrderQueryApi::new(orders);
    let gateway = PushPaymentGateway::new(payments, client, PushGatewayConfig::default());
    cfg.service(PushPaymentRoute::<MockStore, MockPushClient>::new())
        .app_data(web::Data::new(query_api))
        .app_data(web::Data::new(gateway));
}

fn configure_callbacks(cfg: &mut ServiceConfig, payments: MockStore) {
    // Translating a callback never touches the gateway's store or client
    let gateway = PushPaymentGateway::new(MockStore::new(), MockPushClient::new(), PushGatewayConfig::default());
    let reconciliation_api = ReconciliationApi::new(payments, EventProducers::default());
    cfg.service(PushCallbackRoute::<MockStore, MockPushClient>::new())
        .app_data(web::Data::new(gateway))
        .app_data(web::Data::new(reconciliation_api));
}
