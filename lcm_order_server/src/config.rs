use std::{env, net::IpAddr};

use lcm_common::helpers::parse_boolean_flag;
use log::*;
use pg_tools::IamportConfig;

const DEFAULT_LCM_HOST: &str = "127.0.0.1";
const DEFAULT_LCM_PORT: u16 = 8460;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/lcm_orders.db";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// If supplied, payment webhook calls are only accepted from these addresses.
    /// To explicitly disable the whitelist, set LCM_WEBHOOK_IP_WHITELIST to "false", "none", or "0".
    pub webhook_whitelist: Option<Vec<IpAddr>>,
    pub iamport: IamportConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LCM_HOST.to_string(),
            port: DEFAULT_LCM_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            webhook_whitelist: None,
            iamport: IamportConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("LCM_HOST").ok().unwrap_or_else(|| DEFAULT_LCM_HOST.into());
        let port = env::var("LCM_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for LCM_PORT. {e} Using the default, {DEFAULT_LCM_PORT}, instead."
                    );
                    DEFAULT_LCM_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_LCM_PORT);
        let database_url = env::var("LCM_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ LCM_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("LCM_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("LCM_USE_FORWARDED").ok(), false);
        let webhook_whitelist = env::var("LCM_WEBHOOK_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &webhook_whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The webhook IP whitelist was configured, but is empty. The server will run, but won't accept \
                     any payment webhook calls."
                );
            },
            None => info!("🪛️ No webhook IP whitelist is set. Webhook calls are accepted from any address."),
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Webhook IP whitelist: {addrs}");
            },
        }
        let iamport = IamportConfig::new_from_env_or_default();
        Self { host, port, database_url, use_x_forwarded_for, use_forwarded, webhook_whitelist, iamport }
    }

    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig { use_x_forwarded_for: self.use_x_forwarded_for, use_forwarded: self.use_forwarded }
    }
}

/// Parses a comma-separated list of IP addresses. "none", "false" and "0" disable the whitelist. Invalid entries are
/// skipped.
pub fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!("🪛️ Webhook IP whitelist is disabled.");
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in LCM_WEBHOOK_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

/// How to find the caller's address behind a reverse proxy. Secrets stay out of here, since it is shared with every
/// worker.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProxyConfig {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}
