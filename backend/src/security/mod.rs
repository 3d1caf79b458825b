pub mod audit;
pub mod csrf;
pub mod headers;
pub mod rate_limit;

use actix_web::dev::ServiceRequest;

/// Client key for auditing and rate limiting: the peer IP, never a
/// client-supplied forwarding header.
pub fn client_address(req: &ServiceRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
