//! Client IP extraction, used to key the login/register rate limiters.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request};

/// Header set by a trusted reverse proxy carrying the client address.
///
/// Only consulted when configured with `--ip-header`; otherwise the socket
/// address is used and client-supplied headers are ignored.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientIpHeader {
    /// `X-Forwarded-For`; the last entry is the one the proxy appended
    XForwardedFor,
    XRealIp,
    CfConnectingIp,
}

impl ClientIpHeader {
    pub fn header_name(self) -> &'static str {
        match self {
            ClientIpHeader::XForwardedFor => "x-forwarded-for",
            ClientIpHeader::XRealIp => "x-real-ip",
            ClientIpHeader::CfConnectingIp => "cf-connecting-ip",
        }
    }

    fn parse(self, value: &str) -> Option<IpAddr> {
        let raw = match self {
            ClientIpHeader::XForwardedFor => value.rsplit(',').next()?,
            ClientIpHeader::XRealIp | ClientIpHeader::CfConnectingIp => value,
        };
        raw.trim().parse().ok()
    }
}

/// Client IP for rate limiting.
///
/// With `ip_header` set, the address must come from that header; a missing or
/// unparseable value is `None` (no fallback to the socket address). Without
/// it, the socket address from `ConnectInfo` is used, and requests that never
/// went through a socket (in-process calls) share the `"unknown"` bucket.
pub fn extract_client_ip<B>(
    request: &Request<B>,
    ip_header: Option<ClientIpHeader>,
) -> Option<String> {
    match ip_header {
        Some(header) => request
            .headers()
            .get(header.header_name())
            .and_then(|v| v.to_str().ok())
            .and_then(|v| header.parse(v))
            .map(|ip| ip.to_string()),
        None => Some(
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn with_socket(mut request: Request, ip: [u8; 4]) -> Request {
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 4000))));
        request
    }

    #[test]
    fn test_unconfigured_header_is_ignored() {
        let request = Request::builder()
            .header("x-forwarded-for", "10.0.0.1")
            .body(Body::empty())
            .unwrap();
        let request = with_socket(request, [127, 0, 0, 1]);
        assert_eq!(extract_client_ip(&request, None).as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_unknown_without_socket() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_client_ip(&request, None).as_deref(), Some("unknown"));
    }

    #[test]
    fn test_forwarded_for_uses_last_entry() {
        let request = Request::builder()
            .header("x-forwarded-for", "6.6.6.6, 10.0.0.1 ")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract_client_ip(&request, Some(ClientIpHeader::XForwardedFor)).as_deref(),
            Some("10.0.0.1")
        );
    }

    #[test]
    fn test_configured_header_required() {
        let request = Request::builder().body(Body::empty()).unwrap();
        let request = with_socket(request, [127, 0, 0, 1]);
        assert_eq!(extract_client_ip(&request, Some(ClientIpHeader::XRealIp)), None);

        let request = Request::builder()
            .header("x-real-ip", "not-an-ip")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&request, Some(ClientIpHeader::XRealIp)), None);

        let request = Request::builder()
            .header("cf-connecting-ip", "2001:db8::1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract_client_ip(&request, Some(ClientIpHeader::CfConnectingIp)).as_deref(),
            Some("2001:db8::1")
        );
    }
}
