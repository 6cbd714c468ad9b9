#![allow(dead_code)]
//! Scripted payment provider clients and common setup for the engine integration tests.
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use serde_json::json;
use storefront_engine::{
    db_types::ActorContext,
    test_utils::{
        prepare_env::{fresh_database, remove_database},
        seed::{seed_store, SeededStore},
    },
    traits::{
        ExecutedIntent,
        GatewayCallResult,
        PaymentIntent,
        PaymentIntentRequest,
        PushPaymentAccepted,
        PushPaymentClient,
        PushPaymentRequest,
        RedirectPaymentClient,
    },
    OrderManagement,
    SqliteDatabase,
};

pub struct TestStore {
    pub db: SqliteDatabase,
    pub url: String,
    pub store: SeededStore,
}

impl TestStore {
    pub async fn new() -> Self {
        let (db, url) = fresh_database(5).await;
        let store = seed_store(&db).await;
        Self { db, url, store }
    }

    pub async fn tear_down(mut self) {
        if let Err(e) = self.db.close().await {
            log::error!("🚀️ Failed to close database: {e}");
        }
        remove_database(&self.url).await;
    }
}

pub fn alice() -> ActorContext {
    ActorContext::user("alice")
}

pub fn bob() -> ActorContext {
    ActorContext::user("bob")
}

/// Backdates every pending order so that the expiry sweep picks it up
pub async fn age_pending_orders(db: &SqliteDatabase, days: i64) {
    sqlx::query("UPDATE orders SET created_at = datetime('now', $1) WHERE status = 'pending'")
        .bind(format!("-{days} days"))
        .execute(db.pool())
        .await
        .expect("Error backdating orders");
}

pub fn stk_callback(checkout_request_id: &str, result_code: i64, receipt: Option<&str>) -> Vec<u8> {
    let mut callback = json!({
        "MerchantRequestID": "29115-34620561-1",
        "CheckoutRequestID": checkout_request_id,
        "ResultCode": result_code,
        "ResultDesc": if result_code == 0 { "The service request is processed successfully." } else { "Request cancelled by user" },
    });
    if let Some(receipt) = receipt {
        callback["CallbackMetadata"] = json!({ "Item": [
            { "Name": "Amount", "Value": 1.0 },
            { "Name": "MpesaReceiptNumber", "Value": receipt },
            { "Name": "PhoneNumber", "Value": 254712345678u64 }
        ]});
    }
    serde_json::to_vec(&json!({ "Body": { "stkCallback": callback } })).unwrap()
}

//--------------------------------------   Scripted push client  -------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct ScriptedPushClient {
    responses: Arc<Mutex<VecDeque<GatewayCallResult<PushPaymentAccepted>>>>,
    pub requests: Arc<Mutex<Vec<PushPaymentRequest>>>,
    delay: Option<Duration>,
}

impl ScriptedPushClient {
    pub fn accepting(ids: &[&str]) -> Self {
        let client = Self::default();
        for id in ids {
            client.push_response(GatewayCallResult::Success(PushPaymentAccepted {
                correlation_id: id.to_string(),
                customer_message: Some("Success. Request accepted for processing".into()),
                raw: json!({ "CheckoutRequestID": id, "ResponseCode": "0" }),
            }));
        }
        client
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_response(&self, response: GatewayCallResult<PushPaymentAccepted>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl PushPaymentClient for ScriptedPushClient {
    async fn request_payment(&self, request: PushPaymentRequest) -> GatewayCallResult<PushPaymentAccepted> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses.lock().unwrap().pop_front().unwrap_or(GatewayCallResult::Transport("no scripted response".into()))
    }
}

//-------------------------------------- Scripted redirect client -------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct ScriptedRedirectClient {
    intents: Arc<Mutex<VecDeque<GatewayCallResult<PaymentIntent>>>>,
    executions: Arc<Mutex<VecDeque<GatewayCallResult<ExecutedIntent>>>>,
    pub intent_requests: Arc<Mutex<Vec<PaymentIntentRequest>>>,
    pub execute_calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl ScriptedRedirectClient {
    pub fn creating(intent_id: &str) -> Self {
        let client = Self::default();
        client.intents.lock().unwrap().push_back(GatewayCallResult::Success(PaymentIntent {
            intent_id: intent_id.to_string(),
            approval_url: format!("https://www.sandbox.paypal.com/checkoutnow?token={intent_id}"),
            raw: json!({ "id": intent_id, "state": "created" }),
        }));
        client
    }

    pub fn then_execute(self, result: GatewayCallResult<ExecutedIntent>) -> Self {
        self.executions.lock().unwrap().push_back(result);
        self
    }

    pub fn execute_count(&self) -> usize {
        self.execute_calls.lock().unwrap().len()
    }
}

pub fn executed(intent_id: &str, state: &str, sale_id: &str) -> GatewayCallResult<ExecutedIntent> {
    GatewayCallResult::Success(ExecutedIntent {
        intent_id: intent_id.to_string(),
        state: state.to_string(),
        receipt: Some(sale_id.to_string()),
        raw: json!({
            "id": intent_id,
            "state": state,
            "transactions": [ { "related_resources": [ { "sale": { "id": sale_id } } ] } ]
        }),
    })
}

impl RedirectPaymentClient for ScriptedRedirectClient {
    async fn create_intent(&self, request: PaymentIntentRequest) -> GatewayCallResult<PaymentIntent> {
        self.intent_requests.lock().unwrap().push(request);
        self.intents.lock().unwrap().pop_front().unwrap_or(GatewayCallResult::Transport("no scripted intent".into()))
    }

    async fn execute_intent(&self, intent_id: &str, payer_id: &str) -> GatewayCallResult<ExecutedIntent> {
        self.execute_calls.lock().unwrap().push((intent_id.to_string(), payer_id.to_string()));
        self.executions.lock().unwrap().pop_front().unwrap_or(GatewayCallResult::Timeout)
    }
}
