//! Adapters from the `gateway_tools` HTTP clients to the engine's payment client traits.
//!
//! The engine's gateways never see a `reqwest` error. Everything a provider call can do is folded into a
//! [`GatewayCallResult`](storefront_engine::traits::GatewayCallResult) here.
use gateway_tools::GatewayApiError;
use log::*;
use storefront_engine::traits::GatewayCallResult;

mod mpesa;
mod paypal;

pub use mpesa::MpesaGateway;
pub use paypal::PaypalGateway;

fn classify<T>(provider: &str, e: GatewayApiError) -> GatewayCallResult<T> {
    match e {
        GatewayApiError::Timeout => {
            warn!("💳️ {provider} did not respond in time");
            GatewayCallResult::Timeout
        },
        e if e.is_rejection() => {
            info!("💳️ {provider} rejected the request. {e}");
            GatewayCallResult::Rejected(e.to_string())
        },
        e => {
            warn!("💳️ Could not complete the call to {provider}. {e}");
            GatewayCallResult::Transport(e.to_string())
        },
    }
}
