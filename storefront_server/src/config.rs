use std::{env, net::IpAddr, str::FromStr};

use chrono::Duration;
use gateway_tools::{MpesaConfig, PaypalConfig};
use log::*;
use storefront_common::{parse_boolean_flag, DEFAULT_HOME_CURRENCY, DEFAULT_SETTLEMENT_CURRENCY};

const DEFAULT_SFS_HOST: &str = "127.0.0.1";
const DEFAULT_SFS_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_EXCHANGE_RATE_MAX_AGE: Duration = Duration::hours(24);
const DEFAULT_UNPAID_ORDER_TIMEOUT: Duration = Duration::hours(48);
const DEFAULT_EXPIRY_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);
const DEFAULT_GATEWAY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
const DEFAULT_MPESA_COUNTRY_CODE: &str = "254";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// The address customers reach this server on. Hosted-checkout return links point here.
    pub public_base_url: String,
    /// The currency orders are priced in
    pub home_currency: String,
    /// The currency the hosted-checkout provider charges in
    pub settlement_currency: String,
    /// Exchange rates older than this are not used to start a hosted-checkout payment.
    pub exchange_rate_max_age: Duration,
    /// The time before an unpaid order is considered abandoned and cancelled.
    pub unpaid_order_timeout: Duration,
    /// How often the expiry worker runs
    pub expiry_interval: std::time::Duration,
    /// Upper bound on any single call to a payment provider
    pub gateway_timeout: std::time::Duration,
    /// If supplied, payment callbacks are only accepted from these addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub callback_whitelist: Option<Vec<IpAddr>>,
    /// Dialling code used to normalise local phone numbers for push payments
    pub mpesa_country_code: String,
    pub mpesa: MpesaConfig,
    pub paypal: PaypalConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SFS_HOST.to_string(),
            port: DEFAULT_SFS_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            use_x_forwarded_for: false,
            use_forwarded: false,
            public_base_url: format!("http://localhost:{DEFAULT_SFS_PORT}"),
            home_currency: DEFAULT_HOME_CURRENCY.to_string(),
            settlement_currency: DEFAULT_SETTLEMENT_CURRENCY.to_string(),
            exchange_rate_max_age: DEFAULT_EXCHANGE_RATE_MAX_AGE,
            unpaid_order_timeout: DEFAULT_UNPAID_ORDER_TIMEOUT,
            expiry_interval: DEFAULT_EXPIRY_INTERVAL,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            callback_whitelist: None,
            mpesa_country_code: DEFAULT_MPESA_COUNTRY_CODE.to_string(),
            mpesa: MpesaConfig::default(),
            paypal: PaypalConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SFS_HOST").ok().unwrap_or_else(|| DEFAULT_SFS_HOST.into());
        let port = env_or_default("SFS_PORT", DEFAULT_SFS_PORT);
        let database_url = env::var("SFS_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SFS_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = env_or_default("SFS_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let use_x_forwarded_for = parse_boolean_flag(env::var("SFS_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SFS_USE_FORWARDED").ok(), false);
        let public_base_url = env::var("SFS_PUBLIC_BASE_URL").ok().unwrap_or_else(|| {
            let url = format!("http://{host}:{port}");
            warn!(
                "🪛️ SFS_PUBLIC_BASE_URL is not set. Payment return links will point to {url}, which customers probably \
                 cannot reach."
            );
            url
        });
        let home_currency = currency_from_env("SFS_HOME_CURRENCY", DEFAULT_HOME_CURRENCY);
        let settlement_currency = currency_from_env("SFS_SETTLEMENT_CURRENCY", DEFAULT_SETTLEMENT_CURRENCY);
        let exchange_rate_max_age = hours_from_env("SFS_EXCHANGE_RATE_MAX_AGE", DEFAULT_EXCHANGE_RATE_MAX_AGE);
        let unpaid_order_timeout = hours_from_env("SFS_UNPAID_ORDER_TIMEOUT", DEFAULT_UNPAID_ORDER_TIMEOUT);
        let expiry_interval = std::time::Duration::from_secs(env_or_default(
            "SFS_EXPIRY_INTERVAL",
            DEFAULT_EXPIRY_INTERVAL.as_secs(),
        ));
        let gateway_timeout =
            std::time::Duration::from_secs(env_or_default("SFS_GATEWAY_TIMEOUT", DEFAULT_GATEWAY_TIMEOUT.as_secs()));
        let callback_whitelist = configure_callback_whitelist(env::var("SFS_CALLBACK_IP_WHITELIST").ok());
        let mpesa_country_code =
            env::var("SFS_MPESA_COUNTRY_CODE").ok().unwrap_or_else(|| DEFAULT_MPESA_COUNTRY_CODE.to_string());
        let mpesa = MpesaConfig::new_from_env_or_default();
        let paypal = PaypalConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            max_connections,
            use_x_forwarded_for,
            use_forwarded,
            public_base_url,
            home_currency,
            settlement_currency,
            exchange_rate_max_age,
            unpaid_order_timeout,
            expiry_interval,
            gateway_timeout,
            callback_whitelist,
            mpesa_country_code,
            mpesa,
            paypal,
        }
    }
}

fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

fn hours_from_env(name: &str, default: Duration) -> Duration {
    env::var(name)
        .map_err(|_| info!("🪛️ {name} is not set. Using the default value of {} hrs.", default.num_hours()))
        .and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}"))
                .and_then(|h| {
                    if h > 0 {
                        Ok(Duration::hours(h))
                    } else {
                        warn!("🪛️ {name} must be a positive number of hours");
                        Err(())
                    }
                })
        })
        .ok()
        .unwrap_or(default)
}

fn currency_from_env(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(s) if s.trim().len() == 3 && s.trim().chars().all(|c| c.is_ascii_alphabetic()) => s.trim().to_uppercase(),
        Ok(s) => {
            warn!("🪛️ {s} is not a valid currency code for {name}. Using {default}.");
            default.to_string()
        },
        Err(_) => default.to_string(),
    }
}

/// Parses a comma-separated list of IP addresses. Returns `None` when the whitelist is unset or explicitly disabled.
pub fn configure_callback_whitelist(value: Option<String>) -> Option<Vec<IpAddr>> {
    let whitelist = value.and_then(|s| {
        if ["none", "false", "0"].contains(&s.to_lowercase().as_str()) {
            info!(
                "🪛️ The payment callback IP whitelist is disabled. If this is not what you want, set \
                 SFS_CALLBACK_IP_WHITELIST to a comma-separated list of IP addresses to enable it."
            );
            return None;
        }
        let ip_addrs = s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| {
                s.parse()
                    .map_err(|e| {
                        warn!("🪛️ Ignoring invalid IP address ({s}) in SFS_CALLBACK_IP_WHITELIST: {e}");
                    })
                    .ok()
            })
            .collect::<Vec<IpAddr>>();
        Some(ip_addrs)
    });
    match &whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The payment callback IP whitelist was configured, but is empty. The server will run, but won't \
                 accept any payment callbacks."
            );
        },
        None => {
            warn!("🪛️ No payment callback IP whitelist is set. Callbacks will be accepted from any address.");
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ Payment callback IP whitelist: {addrs}");
        },
    }
    whitelist
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn whitelist_parsing() {
        assert!(configure_callback_whitelist(None).is_none());
        assert!(configure_callback_whitelist(Some("none".into())).is_none());
        assert!(configure_callback_whitelist(Some("FALSE".into())).is_none());
        let list = configure_callback_whitelist(Some("196.201.214.200, bogus,196.201.214.206".into())).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].to_string(), "196.201.214.200");
        let empty = configure_callback_whitelist(Some("bogus".into())).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::new("0.0.0.0", 9000);
        assert_eq!(config.port, 9000);
        assert_eq!(config.unpaid_order_timeout, Duration::hours(48));
        assert_eq!(config.home_currency, "KES");
        assert_eq!(config.settlement_currency, "USD");
        let options = ServerOptions::from_config(&config);
        assert!(!options.use_forwarded);
    }
}
