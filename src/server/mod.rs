use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use tower_http::trace::TraceLayer;

use crate::core::pipeline::{DispatchOutcome, DispatchPipeline};
use crate::core::request::{GatewayBody, GatewayRequest};
use crate::core::response::GatewayResponse;
use crate::error::GatewayError;

/// Run the gateway server: the host's local routes behind the dispatch
/// middleware.
///
/// Requests the pipeline does not claim fall through to `local_routes`
/// untouched.
pub async fn serve(
    addr: SocketAddr,
    pipeline: Arc<DispatchPipeline>,
    local_routes: axum::Router,
) -> Result<(), GatewayError> {
    let app = local_routes
        .layer(axum::middleware::from_fn_with_state(
            pipeline,
            dispatch_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Starting gateway server on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GatewayError::InternalError(format!("server error: {}", e)))?;

    tracing::info!("Gateway server has been shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

/// Bridge between the hosting layer and the dispatch pipeline.
///
/// Also the last-resort error responder: any error escaping the pipeline is
/// logged and answered with its mapped status, never a hung connection.
pub async fn dispatch_middleware(
    State(pipeline): State<Arc<DispatchPipeline>>,
    request: Request<Body>,
    next: Next<Body>,
) -> axum::response::Response {
    let gateway_request = into_gateway_request(request);
    let request_id = gateway_request.request_id.clone();

    match pipeline.dispatch(gateway_request).await {
        Ok(DispatchOutcome::Completed(response)) => into_axum_response(response),
        Ok(DispatchOutcome::Passthrough(request))
        | Ok(DispatchOutcome::LocalOverride(request)) => {
            next.run(into_axum_request(request)).await
        }
        Err(err) => {
            tracing::error!(request_id = %request_id, "request failed: {}", err);
            let status = StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            into_axum_response(GatewayResponse::error(status, &err.to_string()))
        }
    }
}

/// Convert a hosting-layer request without buffering its body
fn into_gateway_request(request: Request<Body>) -> GatewayRequest {
    let (parts, body) = request.into_parts();

    let client_ip = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok());

    GatewayRequest::new(
        parts.method,
        parts.uri,
        parts.headers,
        GatewayBody::from_hyper(body),
        client_ip,
    )
}

/// Rebuild a hosting-layer request for passthrough
fn into_axum_request(request: GatewayRequest) -> Request<Body> {
    let mut builder = Request::builder()
        .method(request.method)
        .uri(request.uri);

    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }

    builder.body(request.body.into_hyper()).unwrap()
}

/// Convert a gateway response, streaming its body to the caller
fn into_axum_response(response: GatewayResponse) -> axum::response::Response {
    let mut builder = Response::builder().status(response.status);

    for (name, value) in response.headers.iter() {
        builder = builder.header(name, value);
    }

    match builder.body(response.body.into_hyper()) {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!("failed to build response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;
    use hyper::{HeaderMap, Method};

    #[test]
    fn test_into_gateway_request_parses_forwarded_ip() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/catalog/api/brand/5")
            .header("x-forwarded-for", "10.0.0.1, 192.168.0.1")
            .body(Body::empty())
            .unwrap();

        let gateway_request = into_gateway_request(request);

        assert_eq!(gateway_request.method, Method::GET);
        assert_eq!(
            gateway_request.client_ip,
            Some("10.0.0.1".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn test_into_axum_response_preserves_status_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-upstream", HeaderValue::from_static("catalog"));

        let response = GatewayResponse::new(
            StatusCode::CREATED,
            headers,
            GatewayBody::from_bytes("created"),
        );

        let axum_response = into_axum_response(response);
        assert_eq!(axum_response.status(), StatusCode::CREATED);
        assert_eq!(axum_response.headers().get("x-upstream").unwrap(), "catalog");
    }
}
