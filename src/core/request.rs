use std::fmt;
use std::net::IpAddr;
use std::pin::Pin;
use std::time::SystemTime;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use hyper::{HeaderMap, Method, Uri};

use crate::auth::models::Identity;

/// Boxed byte stream used for single-consumption request and response bodies
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static>>;

/// A request or response body.
///
/// Consumed exactly once: either collected into memory or drained as a
/// stream. There is deliberately no way to clone or re-read it.
pub enum GatewayBody {
    /// No body
    Empty,

    /// Fully buffered body
    Full(Bytes),

    /// Streaming body, not buffered in memory
    Streaming(BodyStream),
}

impl GatewayBody {
    /// Create an empty body
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a body from in-memory bytes
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::Full(bytes.into())
    }

    /// Create a body from a byte stream
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static,
    {
        Self::Streaming(Box::pin(stream))
    }

    /// Wrap a hyper body without buffering it
    pub fn from_hyper(body: hyper::Body) -> Self {
        Self::Streaming(Box::pin(body.map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::Other, e)
        })))
    }

    /// Consume the body as a stream of byte chunks
    pub fn into_stream(self) -> BodyStream {
        match self {
            GatewayBody::Empty => Box::pin(stream::empty()),
            GatewayBody::Full(bytes) => {
                Box::pin(stream::once(async move { Ok::<_, std::io::Error>(bytes) }))
            }
            GatewayBody::Streaming(stream) => stream,
        }
    }

    /// Consume the body into a hyper body
    pub fn into_hyper(self) -> hyper::Body {
        match self {
            GatewayBody::Empty => hyper::Body::empty(),
            GatewayBody::Full(bytes) => hyper::Body::from(bytes),
            GatewayBody::Streaming(stream) => hyper::Body::wrap_stream(stream),
        }
    }

    /// Collect the whole body into memory
    pub async fn collect(self) -> Result<Bytes, std::io::Error> {
        match self {
            GatewayBody::Empty => Ok(Bytes::new()),
            GatewayBody::Full(bytes) => Ok(bytes),
            GatewayBody::Streaming(mut stream) => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl fmt::Debug for GatewayBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayBody::Empty => f.write_str("GatewayBody::Empty"),
            GatewayBody::Full(bytes) => write!(f, "GatewayBody::Full({} bytes)", bytes.len()),
            GatewayBody::Streaming(_) => f.write_str("GatewayBody::Streaming"),
        }
    }
}

/// Represents a request travelling through the gateway.
///
/// Owned exclusively by the pipeline invocation that created it and threaded
/// by value through each stage; never shared across requests.
#[derive(Debug)]
pub struct GatewayRequest {
    /// HTTP method
    pub method: Method,

    /// Request URI (path rewritten once before forwarding)
    pub uri: Uri,

    /// HTTP headers
    pub headers: HeaderMap,

    /// Request body
    pub body: GatewayBody,

    /// Authenticated principal, if any
    pub identity: Option<Identity>,

    /// Client IP address
    pub client_ip: Option<IpAddr>,

    /// Request timestamp
    pub timestamp: SystemTime,

    /// Request ID for tracing
    pub request_id: String,
}

impl GatewayRequest {
    /// Create a new GatewayRequest
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: GatewayBody,
        client_ip: Option<IpAddr>,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            identity: None,
            client_ip,
            timestamp: SystemTime::now(),
            request_id: generate_request_id(),
        }
    }

    /// Get a header value as a string
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    /// Extract the bearer token from the Authorization header
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(hyper::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|auth_header| auth_header.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
    }

    /// Remove the `/{service_name}` routing prefix from the path.
    ///
    /// Strips exactly `1 + service_name.len()` characters, preserving the
    /// case of the remainder and the query string. An empty remainder
    /// becomes `/`.
    pub fn strip_route_prefix(&mut self, service_name: &str) {
        let path = self.uri.path();
        let prefix_len = 1 + service_name.len();

        let remainder = if path.len() > prefix_len {
            &path[prefix_len..]
        } else {
            "/"
        };
        let remainder = if remainder.is_empty() { "/" } else { remainder };

        let path_and_query = match self.uri.query() {
            Some(query) => format!("{}?{}", remainder, query),
            None => remainder.to_string(),
        };

        if let Ok(uri) = path_and_query.parse::<Uri>() {
            self.uri = uri;
        }
    }
}

/// Generate a unique request ID
fn generate_request_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::UNIX_EPOCH;

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

    format!("{:x}-{:x}", timestamp, counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn request(method: Method, uri: &str) -> GatewayRequest {
        GatewayRequest::new(
            method,
            uri.parse().unwrap(),
            HeaderMap::new(),
            GatewayBody::empty(),
            None,
        )
    }

    #[test]
    fn test_gateway_request_new() {
        let request = request(Method::GET, "/catalog/api/brand/5");

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.uri.path(), "/catalog/api/brand/5");
        assert!(request.identity.is_none());
        assert!(!request.request_id.is_empty());
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut request = request(Method::GET, "/catalog/api/brand/5");
        request.headers.insert(
            hyper::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer token123"),
        );

        assert_eq!(request.bearer_token(), Some("token123"));
    }

    #[test]
    fn test_bearer_token_missing_or_malformed() {
        let mut request = request(Method::GET, "/x");
        assert_eq!(request.bearer_token(), None);

        request.headers.insert(
            hyper::header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(request.bearer_token(), None);

        request.headers.insert(
            hyper::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer "),
        );
        assert_eq!(request.bearer_token(), None);
    }

    #[test]
    fn test_strip_route_prefix() {
        let mut request = request(Method::GET, "/catalog/api/brand/5");
        request.strip_route_prefix("catalog");

        assert_eq!(request.uri.path(), "/api/brand/5");
    }

    #[test]
    fn test_strip_route_prefix_preserves_case_and_query() {
        let mut request = request(Method::GET, "/Catalog/api/Brand/5?Page=1&size=20");
        request.strip_route_prefix("catalog");

        assert_eq!(request.uri.path(), "/api/Brand/5");
        assert_eq!(request.uri.query(), Some("Page=1&size=20"));
    }

    #[test]
    fn test_strip_route_prefix_service_root() {
        let mut bare = request(Method::GET, "/catalog");
        bare.strip_route_prefix("catalog");
        assert_eq!(bare.uri.path(), "/");

        let mut trailing = request(Method::GET, "/catalog/");
        trailing.strip_route_prefix("catalog");
        assert_eq!(trailing.uri.path(), "/");
    }

    #[tokio::test]
    async fn test_body_collect_variants() {
        assert!(GatewayBody::empty().collect().await.unwrap().is_empty());

        let body = GatewayBody::from_bytes("hello");
        assert_eq!(body.collect().await.unwrap(), Bytes::from("hello"));

        let chunks = vec![Ok(Bytes::from("he")), Ok(Bytes::from("llo"))];
        let body = GatewayBody::from_stream(futures::stream::iter(chunks));
        assert_eq!(body.collect().await.unwrap(), Bytes::from("hello"));
    }

    #[tokio::test]
    async fn test_body_into_stream_single_consumption() {
        let body = GatewayBody::from_bytes("payload");
        let collected: Vec<_> = body.into_stream().try_collect::<Vec<_>>().await.unwrap();
        assert_eq!(collected, vec![Bytes::from("payload")]);
    }
}
