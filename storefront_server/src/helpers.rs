use std::{net::IpAddr, str::FromStr};

use actix_web::{dev::ServiceRequest, HttpRequest};
use log::*;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ServerOptions;

static FORWARDED_FOR: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r#"for="?(?P<ip>[^;,"]+)"?"#));

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
    remote_ip_from_parts(req.headers(), peer_addr, use_x_forwarded_for, use_forwarded)
}

/// As [`get_remote_ip`], for middleware that only has the `ServiceRequest`.
pub fn get_service_remote_ip(req: &ServiceRequest, options: ServerOptions) -> Option<IpAddr> {
    let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
    remote_ip_from_parts(req.headers(), peer_addr, options.use_x_forwarded_for, options.use_forwarded)
}

fn remote_ip_from_parts(
    headers: &actix_web::http::header::HeaderMap,
    peer_addr: Option<String>,
    use_x_forwarded_for: bool,
    use_forwarded: bool,
) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        // The left-most entry is the original client
        result = headers
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
        result = match &*FORWARDED_FOR {
            Ok(re) => headers
                .get("Forwarded")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| re.captures(v))
                .and_then(|caps| caps.name("ip"))
                .map(|m| m.as_str())
                .and_then(|s| IpAddr::from_str(s).ok()),
            Err(e) => {
                error!("Invalid Forwarded header pattern. {e}");
                None
            },
        };
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}

/// True if `ip` may call a whitelisted endpoint. No whitelist means everyone may; an unknown address never may.
pub fn is_whitelisted(ip: Option<IpAddr>, whitelist: Option<&[IpAddr]>) -> bool {
    match (ip, whitelist) {
        (_, None) => true,
        (Some(ip), Some(whitelist)) => whitelist.contains(&ip),
        (None, Some(_)) => {
            warn!("No IP address found for the remote peer, denying access.");
            false
        },
    }
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn forwarded_headers() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.9, 10.0.0.1"))
            .insert_header(("Forwarded", "for=198.51.100.17;proto=https"))
            .peer_addr("127.0.0.1:5000".parse().unwrap())
            .to_http_request();
        assert_eq!(get_remote_ip(&req, true, true), Some("203.0.113.9".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, false, true), Some("198.51.100.17".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, false, false), Some("127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn quoted_forwarded_header() {
        assert!(FORWARDED_FOR.is_ok());
        let req = TestRequest::default()
            .insert_header(("Forwarded", r#"proto=https;for="192.0.2.60";by=203.0.113.43"#))
            .to_http_request();
        assert_eq!(get_remote_ip(&req, false, true), Some("192.0.2.60".parse().unwrap()));
    }

    #[test]
    fn whitelist() {
        let allowed: Vec<IpAddr> = vec!["196.201.214.200".parse().unwrap()];
        assert!(is_whitelisted(Some("196.201.214.200".parse().unwrap()), Some(&allowed)));
        assert!(!is_whitelisted(Some("10.1.1.1".parse().unwrap()), Some(&allowed)));
        assert!(!is_whitelisted(None, Some(&allowed)));
        assert!(is_whitelisted(None, None));
    }
}
