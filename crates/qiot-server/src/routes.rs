//! HTTP routes for the ingestion server

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use qiot_core::{
    LatestResponse, MetricsResponse, PublicKeyResponse, SendDataRequest, SendDataResponse, StatusResponse,
};

use crate::error::{Result, ServerError};
use crate::ingest::ingest;
use crate::metrics;
use crate::state::SharedState;

/// Publish the server's public key
async fn get_public_key(State(state): State<SharedState>) -> Json<PublicKeyResponse> {
    metrics::record_public_key_request();

    Json(PublicKeyResponse {
        public_key: state.public_key_hex(),
        algorithm: Some(state.keypair().algorithm()),
    })
}

/// Ingest one masked telemetry message
async fn send_data(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<SendDataRequest>, JsonRejection>,
) -> Result<Json<SendDataResponse>> {
    let start = Instant::now();
    metrics::record_ingest_start();

    let result = handle_send_data(&state, payload);

    metrics::record_ingest_end();
    let outcome = match &result {
        Ok(_) => metrics::OUTCOME_OK,
        Err(e) if e.is_client_error() => metrics::OUTCOME_CLIENT_ERROR,
        Err(_) => metrics::OUTCOME_SERVER_ERROR,
    };
    metrics::record_ingest(outcome, start.elapsed());

    if let Err(e) = &result {
        tracing::warn!(error = %e, outcome, "Ingestion failed");
    }

    result
}

fn handle_send_data(
    state: &SharedState,
    payload: std::result::Result<Json<SendDataRequest>, JsonRejection>,
) -> Result<Json<SendDataResponse>> {
    let Json(req) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let device_type = req.device_type_or_default().to_string();

    let ingested = ingest(state, &device_type, &req.ciphertext, &req.encrypted_message)?;
    metrics::record_commit();

    Ok(Json(SendDataResponse::Success {
        decrypted: ingested.decoded_text,
        device_type,
    }))
}

/// Liveness banner
async fn status() -> Json<StatusResponse> {
    Json(StatusResponse::running())
}

/// Simulated operational metrics
async fn api_metrics(State(state): State<SharedState>) -> Json<MetricsResponse> {
    Json(MetricsResponse::from(&state.metrics()))
}

/// Most recent ingestion record, or `null`
async fn api_latest(State(state): State<SharedState>) -> Json<LatestResponse> {
    Json(state.latest())
}

/// Experimental: hand out the public half of a fresh, uninstalled keypair
async fn rekey(State(state): State<SharedState>) -> Result<Json<PublicKeyResponse>> {
    let fresh = state.rekey().inspect_err(|_| metrics::record_rekey("error"))?;
    metrics::record_rekey("ok");

    tracing::warn!(
        algorithm = %fresh.algorithm(),
        "Experimental rekey issued; process keypair unchanged"
    );

    Ok(Json(PublicKeyResponse {
        public_key: fresh.public_key_hex(),
        algorithm: Some(fresh.algorithm()),
    }))
}

/// Prometheus text exposition
async fn prometheus_metrics(State(state): State<SharedState>) -> Response {
    match state.prometheus() {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/get_public_key", get(get_public_key))
        .route("/send_data", post(send_data))
        .route("/status", get(status))
        .route("/api/metrics", get(api_metrics))
        .route("/api/latest", get(api_latest))
        .route("/metrics", get(prometheus_metrics));

    if state.config.experimental_rekey {
        router = router.route("/rekey", post(rekey));
    }

    router.layer(CorsLayer::permissive()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use qiot_core::{encapsulate, ServerConfig};
    use tower::ServiceExt;

    use crate::state::create_shared_state;

    async fn call(router: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = router.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_status() {
        let state = create_shared_state(ServerConfig::default()).unwrap();
        let (status, json) = call(create_router(state), Request::get("/status").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "Server running");
        assert_eq!(json["quantum_layer"], "active");
    }

    #[tokio::test]
    async fn test_public_key_is_hex() {
        let state = create_shared_state(ServerConfig::default()).unwrap();
        let (_, json) = call(
            create_router(state.clone()),
            Request::get("/get_public_key").body(Body::empty()).unwrap(),
        )
        .await;
        let pk = hex::decode(json["public_key"].as_str().unwrap()).unwrap();
        assert_eq!(pk, state.keypair().public_key());
        assert_eq!(json["algorithm"], "ML-KEM-512");
    }

    #[tokio::test]
    async fn test_send_data_hello() {
        let state = create_shared_state(ServerConfig::default()).unwrap();
        let kp = state.keypair();
        let (ct, masked) = encapsulate(kp.algorithm(), kp.public_key()).unwrap().seal(b"HELLO");
        let body = serde_json::json!({
            "ciphertext": hex::encode(ct),
            "encrypted_message": hex::encode(masked),
            "device_type": "sensor1",
        });

        let (status, json) = call(create_router(state.clone()), post_json("/send_data", body.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["decrypted"], "HELLO");
        assert_eq!(json["device_type"], "sensor1");
        assert_eq!(state.metrics().message_count, 1);
    }

    #[tokio::test]
    async fn test_missing_field_is_in_band_error() {
        let state = create_shared_state(ServerConfig::default()).unwrap();
        let (status, json) = call(
            create_router(state.clone()),
            post_json("/send_data", r#"{"ciphertext": "00"}"#.to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "error");
        assert!(json["message"].as_str().unwrap().contains("encrypted_message"));
        assert_eq!(state.metrics().message_count, 0);
    }

    #[tokio::test]
    async fn test_rekey_only_when_enabled() {
        let state = create_shared_state(ServerConfig::default()).unwrap();
        let resp = create_router(state)
            .oneshot(Request::post("/rekey").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let state = create_shared_state(ServerConfig::default().with_experimental_rekey(true)).unwrap();
        let (status, json) = call(
            create_router(state.clone()),
            Request::post("/rekey").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(json["public_key"].as_str().unwrap(), state.public_key_hex());
    }

    #[tokio::test]
    async fn test_prometheus_absent_without_recorder() {
        let state = create_shared_state(ServerConfig::default()).unwrap();
        let resp = create_router(state)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
