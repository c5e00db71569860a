//! Web server setup and routing
//!
//! The router is synthesized from the gateway's route table: each route gets
//! a handler closure that captures only its `RouteTarget` and looks up the
//! bound hardware in the gateway at request time.

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Query, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::MethodRouter,
    Router,
};
use capgate_core::{Gateway, Reply, RequestInfo, RouteMethod, RouteTarget};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

/// Largest request body handlers will buffer; larger payloads count as absent
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the HTTP router for a built gateway
pub fn router(gateway: Arc<Gateway>) -> Router {
    let mut app = Router::new();

    for route in gateway.routes() {
        let mut methods: MethodRouter<Arc<Gateway>> = MethodRouter::new();
        for method in route.methods {
            let handler = route_handler(route.target);
            methods = match method {
                RouteMethod::Get => methods.get(handler),
                RouteMethod::Post => methods.post(handler),
            };
        }
        // Known path, wrong method: same diagnostic as an unknown path.
        // HEAD would otherwise fall through to the GET handler and drive the pin.
        methods = methods.head(not_found).fallback(not_found);

        debug!(path = %route.path, target = ?route.target, "Bound route");
        app = app.route(&route.path, methods);
    }

    app.fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(gateway)
}

/// Handler closure for one route target
fn route_handler(
    target: RouteTarget,
) -> impl Fn(State<Arc<Gateway>>, Result<Bytes, BytesRejection>) -> std::future::Ready<Response>
       + Clone
       + Send
       + Sync
       + 'static {
    move |State(gateway): State<Arc<Gateway>>, body: Result<Bytes, BytesRejection>| {
        let body = read_body(body);
        let reply = gateway.handle(target, body.as_deref());
        std::future::ready(into_response(reply))
    }
}

/// Request body as text, `None` when it could not be buffered
fn read_body(body: Result<Bytes, BytesRejection>) -> Option<String> {
    match body {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            warn!(error = %e, "Request body dropped");
            None
        }
    }
}

/// Catch-all for unmatched requests
async fn not_found(
    State(gateway): State<Arc<Gateway>>,
    method: Method,
    uri: Uri,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let args = Query::<Vec<(String, String)>>::try_from_uri(&uri)
        .map(|Query(args)| args)
        .unwrap_or_default();

    let request = RequestInfo {
        method: method.as_str().to_string(),
        uri: uri.path().to_string(),
        args,
        body: read_body(body),
    };
    into_response(gateway.not_found(&request))
}

fn into_response(reply: Reply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, reply.content_type)], reply.body).into_response()
}

/// Run plain HTTP server
pub async fn run(gateway: Arc<Gateway>, bind: &str) -> Result<()> {
    let app = router(gateway);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use capgate_core::{
        CapabilityRegistry, Level, ManifestFormat, OutputDescriptor, PinId, PinWrite,
        RecordingActuator, SensorDescriptor,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use tower::ServiceExt;

    struct Fixture {
        app: Router,
        lamp: Arc<RecordingActuator>,
        relay: Arc<RecordingActuator>,
        reads: Arc<AtomicU32>,
    }

    fn fixture(format: ManifestFormat) -> Fixture {
        let lamp = Arc::new(RecordingActuator::new());
        let relay = Arc::new(RecordingActuator::new());
        let reads = Arc::new(AtomicU32::new(0));
        let counter = reads.clone();

        let mut registry = CapabilityRegistry::new();
        registry.add_outputs([
            OutputDescriptor::analog(PinId(13), 0, 255, "Lamp", "Dimmable \"lamp\"", lamp.clone()),
            OutputDescriptor::binary(PinId(4), "Relay", "Pump relay", relay.clone()),
        ]);
        registry.add_sensors([SensorDescriptor::new(
            "Lux",
            "Light level",
            Arc::new(move || 100.0 + counter.fetch_add(1, Ordering::SeqCst) as f32),
        )]);
        let gateway = Arc::new(registry.build(format).unwrap());

        Fixture {
            app: router(gateway),
            lamp,
            relay,
            reads,
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_register_serves_manifest() {
        let f = fixture(ManifestFormat::Json);

        for method in ["GET", "POST"] {
            let (status, body) = send(&f.app, method, "/register", "").await;
            assert_eq!(status, StatusCode::OK);

            let manifest: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(manifest["outputs"].as_array().unwrap().len(), 2);
            assert_eq!(manifest["outputs"][0]["description"], "Dimmable \"lamp\"");
            assert_eq!(manifest["outputs"][1]["outputId"], 1);
            assert_eq!(manifest["outputs"][1]["isBinary"], true);
            assert_eq!(manifest["inputs"][0]["inputId"], 0);
        }
    }

    #[tokio::test]
    async fn test_register_legacy_format() {
        let f = fixture(ManifestFormat::Legacy);
        let (status, body) = send(&f.app, "GET", "/register", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("{'outputs':[{'name':'Lamp'"));
        assert!(body.contains("'inputId':'0'"));
    }

    #[tokio::test]
    async fn test_turn_on_and_off() {
        let f = fixture(ManifestFormat::Json);

        let (status, _) = send(&f.app, "GET", "/output/1/turn-on", "").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&f.app, "GET", "/output/1/turn-off", "").await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(
            f.relay.writes(),
            vec![PinWrite::Digital(Level::High), PinWrite::Digital(Level::Low)]
        );
        assert!(f.lamp.writes().is_empty());
    }

    #[tokio::test]
    async fn test_set_value() {
        let f = fixture(ManifestFormat::Json);

        let (status, body) = send(&f.app, "POST", "/output/0/set-value", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "value not received");
        assert!(f.lamp.writes().is_empty());

        let (status, body) = send(&f.app, "POST", "/output/0/set-value", "128").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "value received:\n128\n");
        assert_eq!(f.lamp.writes(), vec![PinWrite::Analog(128)]);
    }

    #[tokio::test]
    async fn test_binary_output_has_no_set_value() {
        let f = fixture(ManifestFormat::Json);
        let (status, _) = send(&f.app, "POST", "/output/1/set-value", "1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(f.relay.writes().is_empty());
    }

    #[tokio::test]
    async fn test_sensor_is_read_per_request() {
        let f = fixture(ManifestFormat::Json);

        let (status, first) = send(&f.app, "GET", "/sensor/0", "").await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = send(&f.app, "GET", "/sensor/0", "").await;

        assert_eq!(first, "100");
        assert_eq!(second, "101");
        assert_eq!(f.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_path_diagnostic() {
        let f = fixture(ManifestFormat::Json);
        let (status, body) = send(&f.app, "GET", "/output/9/turn-on?x=1&y=two", "").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.starts_with("File Not Found\n\n"));
        assert!(body.contains("URI: /output/9/turn-on\n"));
        assert!(body.contains("Method: GET\n"));
        assert!(body.contains("Arguments: 2\n"));
        assert!(body.contains(" x: 1\n"));
        assert!(body.contains(" y: two\n"));
    }

    #[tokio::test]
    async fn test_wrong_method_is_not_found() {
        let f = fixture(ManifestFormat::Json);
        let (status, body) = send(&f.app, "DELETE", "/output/0/turn-on", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Method: DELETE\n"));
        assert!(f.lamp.writes().is_empty());
    }

    #[tokio::test]
    async fn test_head_does_not_drive_outputs() {
        let f = fixture(ManifestFormat::Json);
        let (status, _) = send(&f.app, "HEAD", "/output/0/turn-on", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(f.lamp.writes().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_body_counts_as_absent() {
        let f = fixture(ManifestFormat::Json);
        let big = "1".repeat(MAX_BODY_BYTES + 1);

        let (status, body) = send(&f.app, "POST", "/output/0/set-value", &big).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "value not received");
        assert!(f.lamp.writes().is_empty());

        let (status, body) = send(&f.app, "POST", "/nope", &big).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Arguments: 0\n"));
    }
}
