use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use log::{debug, trace};
use regex::Regex;

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        result = req.headers().get("X-Forwarded-For").and_then(|v| v.to_str().ok()).and_then(first_forwarded_for);
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req.headers().get("Forwarded").and_then(|v| v.to_str().ok()).and_then(forwarded_for);
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.peer_addr().map(|a| a.ip());
        trace!("Using Peer address for remote address: {peer_addr:?}");
        peer_addr
    })
}

/// The client is the left-most entry in `X-Forwarded-For: client, proxy1, proxy2`.
fn first_forwarded_for(header: &str) -> Option<IpAddr> {
    header.split(',').next().map(str::trim).and_then(|s| IpAddr::from_str(s).ok())
}

/// Extracts the first `for=` address from an RFC 7239 `Forwarded` header. IPv6 addresses are quoted and bracketed,
/// e.g. `for="[2001:db8::1]:4711"`.
fn forwarded_for(header: &str) -> Option<IpAddr> {
    let re = Regex::new(r#"(?i)for="?\[?([0-9a-f.:]+?)\]?(?::\d+)?"?(?:[;,]|$)"#).ok()?;
    re.captures(header).and_then(|caps| caps.get(1)).and_then(|m| IpAddr::from_str(m.as_str()).ok())
}
