use chrono::Duration;
use log::*;
use storefront_engine::{db_types::Order, events::EventProducers, OrderFlowApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, pending orders older than `unpaid_expiry` are cancelled with reason "timeout", whether or not a
/// payment is still in flight. Reserved stock is not returned to inventory. In-flight payments stay `processing`, so a
/// success that arrives after the sweep is still recorded and reported as a reconciliation conflict.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    unpaid_expiry: Duration,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = OrderFlowApi::new(db, producers);
        info!("🕰️ Unpaid order expiry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running unpaid order expiry job");
            match api.expire_stale_orders(unpaid_expiry).await {
                Ok(result) if result.count() == 0 && result.skipped == 0 => {
                    trace!("🕰️ Nothing to expire");
                },
                Ok(result) => {
                    info!("🕰️ {} orders expired, {} skipped", result.count(), result.skipped);
                    debug!("🕰️ Expired unpaid orders: {}", order_list(&result.cancelled));
                },
                Err(e) => {
                    error!("🕰️ Error running unpaid order expiry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| {
            let owner = o.user_id.as_deref().or(o.session_key.as_deref()).unwrap_or("-");
            format!("[{}] {} owner: {owner}", o.id, o.order_number)
        })
        .collect::<Vec<String>>()
        .join(", ")
}
