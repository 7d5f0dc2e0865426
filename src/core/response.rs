use bytes::Bytes;
use hyper::{HeaderMap, StatusCode};

use crate::core::request::GatewayBody;

/// Represents a response produced by the gateway
#[derive(Debug)]
pub struct GatewayResponse {
    /// HTTP status code
    pub status: StatusCode,

    /// HTTP headers
    pub headers: HeaderMap,

    /// Response body
    pub body: GatewayBody,
}

impl GatewayResponse {
    /// Create a new GatewayResponse
    pub fn new(status: StatusCode, headers: HeaderMap, body: GatewayBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a new error response with a JSON body
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = format!("{{\"error\":\"{}\"}}", message.replace('\"', "\\\""));

        let mut headers = HeaderMap::new();
        headers.insert(
            hyper::header::CONTENT_TYPE,
            "application/json".parse().unwrap(),
        );

        Self::new(status, headers, GatewayBody::from_bytes(Bytes::from(body)))
    }
}
