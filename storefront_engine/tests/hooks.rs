use std::{
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use log::*;
use storefront_engine::{
    db_types::{OrderStatusType, PaymentOutcome},
    events::{EventHandlers, EventHooks},
    gateways::{PaymentGateway, PushGatewayConfig, PushPaymentGateway, PushPaymentParams},
    test_utils::seed::fill_cart,
    traits::CallbackEvent,
    OrderFlowApi,
    ReconciliationApi,
};

mod support;

use support::{alice, bob, stk_callback, ScriptedPushClient, TestStore};

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

/// Hooks run on their own tasks. Give them a moment to drain.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn order_lifecycle_hooks() {
    let t = TestStore::new().await;
    let created = HookCalled::default();
    let confirmed = HookCalled::default();
    let annulled = HookCalled::default();
    let changed = Arc::new(Mutex::new(Vec::new()));
    let mut hooks = EventHooks::default();
    let (c1, c2, c3, c4) = (created.clone(), confirmed.clone(), annulled.clone(), changed.clone());
    hooks
        .on_order_created(move |ev| {
            info!("🚀️ Order created: {}", ev.order.order_number);
            c1.called();
            Box::pin(async {})
        })
        .on_order_confirmed(move |_| {
            c2.called();
            Box::pin(async {})
        })
        .on_order_annulled(move |ev| {
            assert_eq!(ev.reason, "changed my mind");
            c3.called();
            Box::pin(async {})
        })
        .on_status_changed(move |ev| {
            c4.lock().unwrap().push((ev.old_status, ev.new_status()));
            Box::pin(async {})
        });
    let handlers = EventHandlers::new(16, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let api = OrderFlowApi::new(t.db.clone(), producers);
    let tshirt = t.store.variant("TSHIRT-M").clone();
    fill_cart(&t.db, &alice(), &[(tshirt.id, 1)]).await;
    let first = api.commit(&alice(), &t.store.station_delivery(), None).await.unwrap().order.order_number;
    fill_cart(&t.db, &bob(), &[(tshirt.id, 1)]).await;
    let second = api.commit(&bob(), &t.store.station_delivery(), None).await.unwrap().order.order_number;

    api.apply_payment_outcome(&first, &PaymentOutcome::Succeeded, "gateway:push").await.unwrap();
    // Replays are not announced
    api.apply_payment_outcome(&first, &PaymentOutcome::Succeeded, "gateway:push").await.unwrap();
    api.advance_status(&first, OrderStatusType::Processing, "staff:carol", None).await.unwrap();
    api.cancel_order(&second, "user:bob", "changed my mind").await.unwrap();
    settle().await;

    assert_eq!(created.count(), 2);
    assert_eq!(confirmed.count(), 1);
    assert_eq!(annulled.count(), 1);
    assert_eq!(*changed.lock().unwrap(), vec![(OrderStatusType::Confirmed, OrderStatusType::Processing)]);
    drop(api);
    t.tear_down().await;
}

#[tokio::test]
async fn reconciliation_hooks() {
    let t = TestStore::new().await;
    let unmatched = HookCalled::default();
    let conflicts = HookCalled::default();
    let confirmed = HookCalled::default();
    let mut hooks = EventHooks::default();
    let (c1, c2, c3) = (unmatched.clone(), conflicts.clone(), confirmed.clone());
    hooks
        .on_unmatched_callback(move |ev| {
            assert_eq!(ev.correlation_id, "ws_CO_ghost");
            c1.called();
            Box::pin(async {})
        })
        .on_reconciliation_conflict(move |ev| {
            assert_eq!(ev.order.status, OrderStatusType::Cancelled);
            c2.called();
            Box::pin(async {})
        })
        .on_order_confirmed(move |_| {
            c3.called();
            Box::pin(async {})
        });
    let handlers = EventHandlers::new(16, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let tshirt = t.store.variant("TSHIRT-M").clone();
    fill_cart(&t.db, &alice(), &[(tshirt.id, 1)]).await;
    let flow = OrderFlowApi::new(t.db.clone(), producers.clone());
    let order = flow.commit(&alice(), &t.store.station_delivery(), None).await.unwrap().order;
    let push = PushPaymentGateway::new(t.db.clone(), ScriptedPushClient::accepting(&["ws_CO_h1"]), PushGatewayConfig::default());
    push.initiate(&order, PushPaymentParams { phone_number: "0712345678".into(), supersede: false }).await.unwrap();
    flow.cancel_order(&order.order_number, "admin:dave", "out of stock").await.unwrap();

    let reconciliation = ReconciliationApi::new(t.db.clone(), producers);
    reconciliation.process(CallbackEvent::failed("ws_CO_ghost", "whatever", serde_json::json!({}))).await.unwrap();
    let late = push.translate_callback(&stk_callback("ws_CO_h1", 0, Some("LATE0003"))).unwrap();
    reconciliation.process(late).await.unwrap();
    settle().await;

    assert_eq!(unmatched.count(), 1);
    assert_eq!(conflicts.count(), 1);
    assert_eq!(confirmed.count(), 0);
    t.tear_down().await;
}
