//! 健康检查与指标快照
//!
//! - GET /health
//! - GET /metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use casa_telemetry::metrics;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            reports_ingested: snapshot.reports_ingested,
            reports_dropped_unknown: snapshot.reports_dropped_unknown,
            reports_dropped_invalid: snapshot.reports_dropped_invalid,
            commands_pubsub: snapshot.commands_pubsub,
            commands_http: snapshot.commands_http,
            commands_failed: snapshot.commands_failed,
            command_latency_ms_total: snapshot.command_latency_ms_total,
            command_latency_ms_count: snapshot.command_latency_ms_count,
            devices_registered: snapshot.devices_registered,
            devices_linked: snapshot.devices_linked,
            heartbeats: snapshot.heartbeats,
            scan_probes: snapshot.scan_probes,
            scan_hits: snapshot.scan_hits,
        })),
    )
        .into_response()
}
