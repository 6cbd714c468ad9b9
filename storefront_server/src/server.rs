use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use gateway_tools::{MpesaApi, PaypalApi};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use storefront_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    gateways::{PushGatewayConfig, PushPaymentGateway, RedirectGatewayConfig, RedirectPaymentGateway},
    CartApi,
    ExchangeRateApi,
    InventoryApi,
    OrderFlowApi,
    OrderQueryApi,
    ReconciliationApi,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    helpers::{get_service_remote_ip, is_whitelisted},
    integrations::{MpesaGateway, PaypalGateway},
    routes::{
        health,
        AdminCancelOrderRoute,
        AdminOrderRoute,
        AdminOrderStatusRoute,
        CancelMyOrderRoute,
        CartAddItemRoute,
        CartMergeRoute,
        CartRemoveItemRoute,
        CartRoute,
        CartUpdateItemRoute,
        CheckoutQuoteRoute,
        CheckoutRoute,
        DeliveryOptionsRoute,
        GetExchangeRateRoute,
        MyOrderRoute,
        MyOrdersRoute,
        PushCallbackRoute,
        PushPaymentRoute,
        RedirectCancelRoute,
        RedirectExecuteRoute,
        RedirectPaymentRoute,
        SetStockRoute,
        UpdateExchangeRateRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = prepare_database(&config).await?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, logging_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let _expiry = start_expiry_worker(
        db.clone(),
        producers.clone(),
        config.unpaid_order_timeout,
        config.expiry_interval,
    );
    let mpesa = MpesaApi::new(config.mpesa.clone())
        .map(MpesaGateway::new)
        .map_err(|e| ServerError::InitializeError(format!("Could not create the M-Pesa client. {e}")))?;
    let paypal = PaypalApi::new(config.paypal.clone())
        .map(PaypalGateway::new)
        .map_err(|e| ServerError::InitializeError(format!("Could not create the PayPal client. {e}")))?;
    let srv = create_server_instance(config, db, producers, mpesa, paypal)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Connects to the ledger, creating the database file and bringing the schema up to date if necessary.
async fn prepare_database(config: &ServerConfig) -> Result<SqliteDatabase, ServerError> {
    let url = config.database_url.as_str();
    let exists = Sqlite::database_exists(url).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if !exists {
        info!("🗃️ Creating new database at {url}");
        Sqlite::create_database(url).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let db = SqliteDatabase::new_with_url(url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    sqlx::migrate!("../storefront_engine/src/sqlite/migrations")
        .run(db.pool())
        .await
        .map_err(|e| ServerError::InitializeError(format!("Could not run database migrations. {e}")))?;
    info!("🗃️ Database ready at {url}");
    Ok(db)
}

/// Everything the engine reports ends up in the log. Notifications to customers and staff hook in here.
fn logging_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(|ev| {
            Box::pin(async move {
                let count = ev.items.len();
                info!("📬️ Order {} created for {} ({count} items)", ev.order.order_number, ev.order.total_amount)
            })
        })
        .on_order_confirmed(|ev| Box::pin(async move { info!("📬️ Order {} has been paid", ev.order.order_number) }))
        .on_order_annulled(|ev| {
            Box::pin(async move { info!("📬️ Order {} was cancelled. {}", ev.order.order_number, ev.reason) })
        })
        .on_status_changed(|ev| {
            Box::pin(async move {
                info!("📬️ Order {} moved from {} to {}", ev.order.order_number, ev.old_status, ev.order.status)
            })
        })
        .on_unmatched_callback(|ev| {
            Box::pin(async move {
                warn!("📬️ Callback for unknown payment {}. Payload: {}", ev.correlation_id, ev.payload)
            })
        })
        .on_reconciliation_conflict(|ev| {
            Box::pin(async move {
                error!(
                    "📬️ Payment {} settled for order {} after it was {}. This needs manual attention.",
                    ev.payment.payment_id, ev.order.order_number, ev.order.status
                )
            })
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    mpesa: MpesaGateway,
    paypal: PaypalGateway,
) -> Result<Server, ServerError> {
    let push_config = PushGatewayConfig {
        country_code: config.mpesa_country_code.clone(),
        timeout: config.gateway_timeout,
        ..Default::default()
    };
    let redirect_config = RedirectGatewayConfig {
        home_currency: config.home_currency.clone(),
        settlement_currency: config.settlement_currency.clone(),
        max_rate_age: config.exchange_rate_max_age,
        public_base_url: config.public_base_url.clone(),
        timeout: config.gateway_timeout,
    };
    let options = ServerOptions::from_config(&config);
    let callback_whitelist = config.callback_whitelist.clone();
    let home_currency = config.home_currency.clone();
    let srv = HttpServer::new(move || {
        let order_flow_api = OrderFlowApi::new(db.clone(), producers.clone()).with_currency(&home_currency);
        let order_query_api = OrderQueryApi::new(db.clone());
        let cart_api = CartApi::new(db.clone());
        let inventory_api = InventoryApi::new(db.clone());
        let rates_api = ExchangeRateApi::new(db.clone());
        let reconciliation_api = ReconciliationApi::new(db.clone(), producers.clone());
        let push_gateway = PushPaymentGateway::new(db.clone(), mpesa.clone(), push_config.clone());
        let redirect_gateway =
            RedirectPaymentGateway::new(db.clone(), paypal.clone(), redirect_config.clone(), producers.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sfs::access_log"))
            .app_data(web::Data::new(order_flow_api))
            .app_data(web::Data::new(order_query_api))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(inventory_api))
            .app_data(web::Data::new(rates_api))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(push_gateway))
            .app_data(web::Data::new(redirect_gateway))
            .app_data(web::Data::new(options));
        let api_scope = web::scope("/api")
            .service(CartRoute::<SqliteDatabase>::new())
            .service(CartAddItemRoute::<SqliteDatabase>::new())
            .service(CartUpdateItemRoute::<SqliteDatabase>::new())
            .service(CartRemoveItemRoute::<SqliteDatabase>::new())
            .service(CartMergeRoute::<SqliteDatabase>::new())
            .service(DeliveryOptionsRoute::<SqliteDatabase>::new())
            .service(CheckoutQuoteRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MyOrderRoute::<SqliteDatabase>::new())
            .service(CancelMyOrderRoute::<SqliteDatabase>::new())
            .service(PushPaymentRoute::<SqliteDatabase, MpesaGateway>::new())
            .service(RedirectPaymentRoute::<SqliteDatabase, PaypalGateway>::new())
            .service(RedirectExecuteRoute::<SqliteDatabase, PaypalGateway>::new())
            .service(RedirectCancelRoute::<SqliteDatabase, PaypalGateway>::new())
            .service(AdminOrderRoute::<SqliteDatabase>::new())
            .service(AdminOrderStatusRoute::<SqliteDatabase>::new())
            .service(AdminCancelOrderRoute::<SqliteDatabase>::new())
            .service(GetExchangeRateRoute::<SqliteDatabase>::new())
            .service(UpdateExchangeRateRoute::<SqliteDatabase>::new())
            .service(SetStockRoute::<SqliteDatabase>::new());
        let whitelist = callback_whitelist.clone();
        let callback_scope = web::scope("/callbacks")
            .wrap_fn(move |req, srv| {
                // Collect peer IP from x-forwarded-for, or forwarded headers _if_ `use_nnn` has been set to true
                // in the configuration. Otherwise, use the peer address from the connection info.
                let peer_ip = get_service_remote_ip(&req, options);
                if is_whitelisted(peer_ip, whitelist.as_deref()) {
                    srv.call(req)
                } else {
                    warn!("💻️ Rejected payment callback from {peer_ip:?}. The address is not whitelisted.");
                    let err = ServerError::InsufficientPermissions("Callbacks are not accepted from here".into());
                    ok(req.error_response(err)).boxed_local()
                }
            })
            .service(PushCallbackRoute::<SqliteDatabase, MpesaGateway>::new());
        app.service(health).service(api_scope).service(callback_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Storefront server listening on {}:{}", config.host, config.port);
    Ok(srv)
}
