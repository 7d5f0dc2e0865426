pub mod multipart;

use std::time::Duration;

use futures::TryStreamExt;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING};
use hyper::{HeaderMap, Method};

use crate::core::registry::ServiceTarget;
use crate::core::request::{GatewayBody, GatewayRequest};
use crate::core::response::GatewayResponse;
use crate::error::{GatewayError, ProxyError};

/// Reverse-proxy transformer.
///
/// Reproduces an inbound request against a resolved backend over a shared,
/// connection-pooling client and relays the response back, stripping the
/// upstream transfer encoding. The whole operation runs inside the caller's
/// request future, so a client disconnect aborts the upstream call and the
/// body copy with it.
pub struct ProxyClient {
    client: reqwest::Client,
}

impl ProxyClient {
    /// Create a proxy client with the default upstream timeout
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a proxy client with the given upstream timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        // Configure connection pooling and keep-alive
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| {
                tracing::warn!("Failed to create HTTP client with custom settings, using default");
                reqwest::Client::new()
            });

        Self { client }
    }

    /// Forward a request to the target service and relay its response
    pub async fn forward(
        &self,
        request: GatewayRequest,
        target: &ServiceTarget,
    ) -> Result<GatewayResponse, GatewayError> {
        let request_id = request.request_id.clone();

        let outbound = match self.build_outbound(request, target).await {
            Ok(builder) => builder,
            Err(err) => {
                tracing::error!(request_id = %request_id, "failed to build outbound request: {}", err);
                return Err(err.into());
            }
        };

        let upstream = outbound.send().await.map_err(|e| {
            if e.is_timeout() {
                ProxyError::UpstreamTimeout(e.to_string())
            } else {
                ProxyError::UpstreamUnreachable(e.to_string())
            }
        })?;

        // Status and headers are available now; the body streams behind them
        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        headers.remove(TRANSFER_ENCODING);

        let body = GatewayBody::from_stream(
            upstream
                .bytes_stream()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
        );

        Ok(GatewayResponse::new(status, headers, body))
    }

    /// Build the outbound request: target URI, preserved method, copied
    /// headers, and the attached body
    async fn build_outbound(
        &self,
        request: GatewayRequest,
        target: &ServiceTarget,
    ) -> Result<reqwest::RequestBuilder, ProxyError> {
        let url = build_target_url(&request.uri, target)?;
        let method = request.method.clone();

        let reencode = carries_body(&method) && multipart::is_multipart(&request.headers);
        let headers = copy_request_headers(&request.headers, reencode);

        let mut builder = self.client.request(method.clone(), url).headers(headers);

        if !carries_body(&method) {
            return Ok(builder);
        }

        if reencode {
            // The inbound stream may already be partially consumed by form
            // parsing and cannot be re-streamed byte for byte
            let form = multipart::reencode(&request.headers, request.body).await?;
            builder = builder.multipart(form);
        } else {
            builder = builder.body(reqwest::Body::wrap_stream(request.body.into_stream()));
        }

        Ok(builder)
    }
}

impl Default for ProxyClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Every method except the bodiless set carries an outbound body
fn carries_body(method: &Method) -> bool {
    !matches!(
        *method,
        Method::GET | Method::HEAD | Method::DELETE | Method::TRACE
    )
}

/// Rewrite the URI: path and query from the inbound request, scheme, host
/// and port from the registry target
fn build_target_url(uri: &hyper::Uri, target: &ServiceTarget) -> Result<reqwest::Url, ProxyError> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    let target_url = format!(
        "{}://{}{}",
        target.scheme.as_str(),
        target.authority(),
        path_and_query
    );

    reqwest::Url::parse(&target_url)
        .map_err(|e| ProxyError::InvalidTarget(format!("{}: {}", target_url, e)))
}

/// Copy inbound headers, preserving multi-value headers.
///
/// `Host` always comes from the target URI. When the body is re-encoded as
/// a new multipart form, the content headers describe the new body and are
/// not copied either.
fn copy_request_headers(headers: &HeaderMap, strip_content_headers: bool) -> HeaderMap {
    let mut copied = HeaderMap::new();

    for (name, value) in headers {
        if *name == HOST {
            continue;
        }
        if strip_content_headers && (*name == CONTENT_TYPE || *name == CONTENT_LENGTH) {
            continue;
        }
        copied.append(name, value.clone());
    }

    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    use crate::core::registry::ServiceScheme;

    #[test]
    fn test_carries_body() {
        assert!(!carries_body(&Method::GET));
        assert!(!carries_body(&Method::HEAD));
        assert!(!carries_body(&Method::DELETE));
        assert!(!carries_body(&Method::TRACE));

        assert!(carries_body(&Method::POST));
        assert!(carries_body(&Method::PUT));
        assert!(carries_body(&Method::PATCH));
        assert!(carries_body(&Method::OPTIONS));
    }

    #[test]
    fn test_build_target_url_replaces_authority() {
        let target = ServiceTarget::new("catalog", "127.0.0.1", ServiceScheme::Http).with_port(5200);
        let uri: hyper::Uri = "/api/brand/5?page=1".parse().unwrap();

        let url = build_target_url(&uri, &target).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5200/api/brand/5?page=1");
    }

    #[test]
    fn test_build_target_url_uses_scheme_default_port() {
        let target = ServiceTarget::new("core", "core.internal", ServiceScheme::Https);
        let uri: hyper::Uri = "/api/user".parse().unwrap();

        let url = build_target_url(&uri, &target).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.port_or_known_default(), Some(443));
    }

    #[test]
    fn test_copy_request_headers_skips_host() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("gateway.example"));
        headers.insert("x-custom", HeaderValue::from_static("1"));
        headers.append("x-multi", HeaderValue::from_static("a"));
        headers.append("x-multi", HeaderValue::from_static("b"));

        let copied = copy_request_headers(&headers, false);

        assert!(copied.get(HOST).is_none());
        assert_eq!(copied.get("x-custom").unwrap(), "1");
        let multi: Vec<_> = copied.get_all("x-multi").iter().collect();
        assert_eq!(multi.len(), 2);
    }

    #[test]
    fn test_copy_request_headers_strips_content_headers_for_multipart() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=abc"),
        );
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("120"));
        headers.insert("x-custom", HeaderValue::from_static("1"));

        let copied = copy_request_headers(&headers, true);

        assert!(copied.get(CONTENT_TYPE).is_none());
        assert!(copied.get(CONTENT_LENGTH).is_none());
        assert_eq!(copied.get("x-custom").unwrap(), "1");
    }
}
