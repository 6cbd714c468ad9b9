use std::collections::HashMap;

use cucumber::World;
use log::*;
use storefront_engine::{
    db_types::{ActorContext, OrderNumber},
    events::EventProducers,
    gateways::{PushGatewayConfig, PushPaymentGateway},
    test_utils::{
        prepare_env::fresh_database,
        seed::{seed_store, SeededStore},
    },
    traits::ReconcileOutcome,
    OrderFlowApi,
    OrderFlowError,
    ReconciliationApi,
    SqliteDatabase,
};

use crate::support::ScriptedPushClient;

#[derive(Default, Debug, World)]
pub struct StorefrontWorld {
    pub system: Option<StorefrontSystem>,
    /// The result of each customer's last checkout
    pub checkouts: HashMap<String, Result<OrderNumber, OrderFlowError>>,
    pub last_outcome: Option<ReconcileOutcome>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct StorefrontSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub store: SeededStore,
    pub flow: OrderFlowApi<SqliteDatabase>,
    pub reconciliation: ReconciliationApi<SqliteDatabase>,
    pub push_client: ScriptedPushClient,
    pub push: PushPaymentGateway<SqliteDatabase, ScriptedPushClient>,
}

impl StorefrontWorld {
    pub fn system(&self) -> &StorefrontSystem {
        self.system.as_ref().expect("Store not initialised")
    }

    pub fn order_of(&self, customer: &str) -> OrderNumber {
        match self.checkouts.get(customer) {
            Some(Ok(order_number)) => order_number.clone(),
            other => panic!("{customer} has no committed order: {other:?}"),
        }
    }
}

impl StorefrontSystem {
    pub async fn new() -> Self {
        let (db, db_path) = fresh_database(5).await;
        let store = seed_store(&db).await;
        debug!("🚀️ Created store database: {db_path}");
        let producers = EventProducers::default();
        let flow = OrderFlowApi::new(db.clone(), producers.clone());
        let reconciliation = ReconciliationApi::new(db.clone(), producers);
        let push_client = ScriptedPushClient::default();
        let push = PushPaymentGateway::new(db.clone(), push_client.clone(), PushGatewayConfig::default());
        Self { db_path, db, store, flow, reconciliation, push_client, push }
    }
}

pub fn customer(name: &str) -> ActorContext {
    ActorContext::user(name)
}
