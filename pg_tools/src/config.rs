use std::time::Duration;

use lcm_common::Secret;
use log::*;

const DEFAULT_IAMPORT_API_URL: &str = "https://api.iamport.kr";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct IamportConfig {
    /// Base url of the REST API, without a trailing slash.
    pub api_url: String,
    pub api_key: Secret<String>,
    pub api_secret: Secret<String>,
    /// Applies to every request, including token exchange.
    pub timeout: Duration,
}

impl Default for IamportConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_IAMPORT_API_URL.to_string(),
            api_key: Secret::default(),
            api_secret: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl IamportConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("LCM_IAMPORT_API_URL").unwrap_or_else(|_| {
            info!("LCM_IAMPORT_API_URL not set, using {DEFAULT_IAMPORT_API_URL}");
            DEFAULT_IAMPORT_API_URL.to_string()
        });
        let api_key = Secret::new(std::env::var("LCM_IAMPORT_API_KEY").unwrap_or_else(|_| {
            warn!("LCM_IAMPORT_API_KEY not set. Gateway calls will be rejected until it is configured.");
            String::default()
        }));
        let api_secret = Secret::new(std::env::var("LCM_IAMPORT_API_SECRET").unwrap_or_else(|_| {
            warn!("LCM_IAMPORT_API_SECRET not set. Gateway calls will be rejected until it is configured.");
            String::default()
        }));
        let timeout = std::env::var("LCM_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>().map_err(|e| warn!("Invalid value for LCM_GATEWAY_TIMEOUT_SECS ({s}). {e}")).ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let api_url = api_url.trim_end_matches('/').to_string();
        Self { api_url, api_key, api_secret, timeout }
    }
}
