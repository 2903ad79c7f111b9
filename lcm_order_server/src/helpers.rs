use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use lcm_common::helpers::is_guest_id;
use log::{debug, trace};
use regex::Regex;

use crate::errors::ServerError;

/// The upstream API gateway authenticates the caller and forwards the user id in this header.
pub const USER_ID_HEADER: &str = "X-User-Id";
pub const GUEST_USER: &str = "guest";

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        // The left-most entry is the original client
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(forwarded_for)
            .and_then(|s| IpAddr::from_str(&s).ok());
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}

fn forwarded_for(header: &str) -> Option<String> {
    let re = Regex::new(r#"for="?(?P<ip>[^;,"]+)"?"#).ok()?;
    re.captures(header).and_then(|caps| caps.name("ip")).map(|m| m.as_str().to_string())
}

/// The caller's user id, or `None` for guests and anonymous requests.
pub fn user_id(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !is_guest_id(s))
}

/// Like [`user_id`], but guests are turned away.
pub fn require_user_id(req: &HttpRequest) -> Result<String, ServerError> {
    user_id(req).ok_or_else(|| {
        debug!("💻️ Request to {} without a signed-in user", req.path());
        ServerError::MissingUserId
    })
}

/// The signed-in user, who must also be the user named in the request, if the request names one.
pub fn acting_user(req: &HttpRequest, claimed: Option<&str>) -> Result<String, ServerError> {
    let user = require_user_id(req)?;
    match claimed.map(str::trim).filter(|s| !s.is_empty()) {
        Some(claimed) if claimed != user => {
            debug!("💻️ User {user} tried to act on behalf of {claimed}");
            Err(ServerError::UserMismatch)
        },
        _ => Ok(user),
    }
}
