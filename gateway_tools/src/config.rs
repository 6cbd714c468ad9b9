use std::{fmt::Display, str::FromStr};

use log::*;
use storefront_common::Secret;

pub const MPESA_SANDBOX_URL: &str = "https://sandbox.safaricom.co.ke";
pub const MPESA_PRODUCTION_URL: &str = "https://api.safaricom.co.ke";
pub const PAYPAL_SANDBOX_URL: &str = "https://api.sandbox.paypal.com";
pub const PAYPAL_LIVE_URL: &str = "https://api.paypal.com";

/// Which of a provider's deployments to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl FromStr for ProviderEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sandbox" | "test" => Ok(Self::Sandbox),
            "production" | "live" => Ok(Self::Production),
            _ => Err(format!("Unknown provider environment: {s}")),
        }
    }
}

impl Display for ProviderEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sandbox => write!(f, "sandbox"),
            Self::Production => write!(f, "production"),
        }
    }
}

fn environment_from_env(var: &str) -> ProviderEnvironment {
    match std::env::var(var) {
        Ok(s) => s.parse().unwrap_or_else(|e| {
            warn!("🪛️ {e}. {var} is falling back to the sandbox");
            ProviderEnvironment::Sandbox
        }),
        Err(_) => {
            info!("🪛️ {var} not set, using the sandbox");
            ProviderEnvironment::Sandbox
        },
    }
}

fn secret_from_env(var: &str) -> Secret<String> {
    Secret::new(std::env::var(var).unwrap_or_else(|_| {
        warn!("🪛️ {var} not set. Calls to the provider will fail to authenticate.");
        String::default()
    }))
}

#[derive(Debug, Clone, Default)]
pub struct MpesaConfig {
    pub environment: ProviderEnvironment,
    pub consumer_key: Secret<String>,
    pub consumer_secret: Secret<String>,
    /// The paybill or till number receiving the funds
    pub shortcode: String,
    pub passkey: Secret<String>,
    /// Where the provider posts the outcome of each push request
    pub callback_url: String,
}

impl MpesaConfig {
    pub fn new_from_env_or_default() -> Self {
        let environment = environment_from_env("SFS_MPESA_ENVIRONMENT");
        let consumer_key = secret_from_env("SFS_MPESA_CONSUMER_KEY");
        let consumer_secret = secret_from_env("SFS_MPESA_CONSUMER_SECRET");
        let passkey = secret_from_env("SFS_MPESA_PASSKEY");
        let shortcode = std::env::var("SFS_MPESA_SHORTCODE").unwrap_or_else(|_| {
            warn!("🪛️ SFS_MPESA_SHORTCODE not set, using the sandbox shortcode 174379");
            "174379".to_string()
        });
        let callback_url = std::env::var("SFS_MPESA_CALLBACK_URL").unwrap_or_else(|_| {
            warn!("🪛️ SFS_MPESA_CALLBACK_URL not set. The provider will not be able to report payment outcomes.");
            "http://localhost:8360/callbacks/push".to_string()
        });
        Self { environment, consumer_key, consumer_secret, shortcode, passkey, callback_url }
    }

    pub fn base_url(&self) -> &'static str {
        match self.environment {
            ProviderEnvironment::Sandbox => MPESA_SANDBOX_URL,
            ProviderEnvironment::Production => MPESA_PRODUCTION_URL,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaypalConfig {
    pub environment: ProviderEnvironment,
    pub client_id: Secret<String>,
    pub client_secret: Secret<String>,
}

impl PaypalConfig {
    pub fn new_from_env_or_default() -> Self {
        let environment = environment_from_env("SFS_PAYPAL_MODE");
        let client_id = secret_from_env("SFS_PAYPAL_CLIENT_ID");
        let client_secret = secret_from_env("SFS_PAYPAL_CLIENT_SECRET");
        Self { environment, client_id, client_secret }
    }

    pub fn base_url(&self) -> &'static str {
        match self.environment {
            ProviderEnvironment::Sandbox => PAYPAL_SANDBOX_URL,
            ProviderEnvironment::Production => PAYPAL_LIVE_URL,
        }
    }
}
