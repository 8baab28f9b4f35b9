//! Peer address allow-list

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Reject peers not on the configured allow-list
///
/// An empty list admits everyone. With a non-empty list, requests whose
/// peer address is unknown are rejected.
pub async fn ip_whitelist(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let allowed = &state.config().ip_whitelist;
    if allowed.is_empty() {
        return Ok(next.run(request).await);
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match peer {
        Some(ip) if is_allowed(allowed, ip) => Ok(next.run(request).await),
        Some(ip) => Err(AppError::Forbidden(format!("peer {} not allowed", ip))),
        None => Err(AppError::Forbidden("unknown peer address".to_string())),
    }
}

fn is_allowed(allowed: &[IpAddr], ip: IpAddr) -> bool {
    let ip = match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    };
    allowed.contains(&ip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{config_for, send, state_for};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::net::Ipv4Addr;

    fn health_from(addr: Option<SocketAddr>) -> Request<Body> {
        let mut request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        if let Some(addr) = addr {
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }

    #[test]
    fn test_mapped_addresses() {
        let allowed = vec![IpAddr::V4(Ipv4Addr::LOCALHOST)];
        let mapped: IpAddr = "::ffff:127.0.0.1".parse().unwrap();
        assert!(is_allowed(&allowed, mapped));
        assert!(!is_allowed(&allowed, "10.0.0.1".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_empty_list_admits_all() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = state_for(config_for(dir.path()));

        let response = send(&state, health_from(None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unlisted_peer_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.ip_whitelist = vec![IpAddr::V4(Ipv4Addr::LOCALHOST)];
        let (state, _) = state_for(config);

        let local = SocketAddr::from(([127, 0, 0, 1], 40000));
        let remote = SocketAddr::from(([192, 168, 1, 9], 40000));

        assert_eq!(send(&state, health_from(Some(local))).await.status(), StatusCode::OK);
        assert_eq!(
            send(&state, health_from(Some(remote))).await.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(send(&state, health_from(None)).await.status(), StatusCode::FORBIDDEN);
    }
}
