//! 路由定义
//!
//! 集中管理所有 API 路由，将路径映射到对应的 handlers。
//! 路由包括：
//! - 健康检查与指标：/health, /metrics
//! - 设备自注册：/api/devices/register（无认证）
//! - 设备管理：/api/devices/*
//! - 认领与释放：/api/devices/unclaimed, /api/devices/claim/*,
//!   /api/devices/claim-by-mac, /api/devices/release/*
//! - 指令下发：/api/control
//! - 缓存状态：/api/status/*
//! - 设备发现：/api/scan, /api/scan/manual

use super::AppState;
use super::handlers::*;
use super::middleware::request_context;
use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;

/// 组装完整应用路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .nest("/api", api_routes())
        .with_state(state)
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(request_context))
        // 前端面板跨域直调
        .layer(CorsLayer::permissive())
}

/// /api 前缀下的业务路由
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/devices/register", post(register_device))
        .route("/devices", get(list_devices).post(create_device))
        .route("/devices/unclaimed", get(list_unclaimed))
        .route("/devices/claim-by-mac", post(claim_device_by_mac))
        .route("/devices/claim/:device_id", post(claim_device))
        .route("/devices/release/:device_id", post(release_device))
        .route(
            "/devices/:device_id",
            put(update_device).delete(delete_device),
        )
        .route("/control", post(control_device))
        .route("/status/:device_id", get(device_status))
        .route("/scan", get(scan_network))
        .route("/scan/manual", post(scan_manual))
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use casa_auth::JwtManager;
    use casa_control::CommandService;
    use casa_discovery::Scanner;
    use casa_provision::{ClaimService, Registrar};
    use casa_storage::DeviceStore;
    use casa_storage::InMemoryDeviceStore;
    use casa_transport::{MemoryTransport, Transport};
    use domain::{
        CallerContext, Channel, DeviceKind, DeviceRecord, Mac, PowerState, TelemetryState,
        TelemetryUpdate, now_epoch_ms,
    };
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> (AppState, Arc<InMemoryDeviceStore>, Arc<MemoryTransport>) {
        let store = Arc::new(InMemoryDeviceStore::new());
        let transport = Arc::new(MemoryTransport::new());
        let store_dyn: Arc<dyn DeviceStore> = store.clone();
        let transport_dyn: Arc<dyn Transport> = transport.clone();
        let state = AppState {
            store: Arc::clone(&store_dyn),
            commands: CommandService::new(Arc::clone(&store_dyn), Arc::clone(&transport_dyn)),
            scanner: Scanner::new(),
            registrar: Arc::new(Registrar::new(Arc::clone(&store_dyn))),
            claims: Arc::new(ClaimService::new(Arc::clone(&store_dyn))),
            jwt: Arc::new(JwtManager::new("test-secret".to_string(), 3600)),
        };
        (state, store, transport)
    }

    fn bearer(state: &AppState, user: &str) -> String {
        let token = state
            .jwt
            .issue_access(&CallerContext::new(user))
            .expect("token");
        format!("Bearer {token}")
    }

    fn get(path: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).expect("request")
    }

    fn json_request(method: &str, path: &str, auth: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).expect("request")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn health_responds() {
        let (state, _, _) = test_state();
        let app = create_router(state);
        let response = app.oneshot(get("/health", None)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn protected_routes_require_bearer_token() {
        let (state, _, _) = test_state();
        let app = create_router(state);
        let response = app
            .oneshot(get("/api/devices", None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "AUTH.UNAUTHORIZED");
    }

    #[tokio::test]
    async fn register_claim_control_flow() {
        let (state, _, transport) = test_state();
        let auth = bearer(&state, "user-1");
        let app = create_router(state);

        // 设备自注册不带凭据
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/devices/register",
                None,
                r#"{"mac":"aa:bb:cc:dd:ee:ff","ip":"192.168.1.60","name":"Hall","firmware":"1.0.3"}"#,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["outcome"], "registered");
        assert_eq!(body["data"]["device"]["mac"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(body["data"]["device"]["firmwareVersion"], "1.0.3");
        let device_id = body["data"]["device"]["deviceId"]
            .as_str()
            .expect("device id")
            .to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/devices/claim-by-mac",
                Some(&auth),
                r#"{"mac":"AA:BB:CC:DD:EE:FF"}"#,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["ownerId"], "user-1");

        let control = format!(
            r#"{{"deviceId":"{device_id}","device":"door","action":"open"}}"#
        );
        let response = app
            .oneshot(json_request("POST", "/api/control", Some(&auth), &control))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["outcome"], "queued");
        assert_eq!(body["data"]["topic"], "cmd/AABBCCDDEEFF");

        let published = transport.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "cmd/AABBCCDDEEFF");
    }

    #[tokio::test]
    async fn register_rejects_bad_mac() {
        let (state, _, _) = test_state();
        let app = create_router(state);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/devices/register",
                None,
                r#"{"mac":"not-a-mac","ip":"192.168.1.61"}"#,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID.REQUEST");
    }

    #[tokio::test]
    async fn create_update_delete_device_flow() {
        let (state, _, _) = test_state();
        let auth = bearer(&state, "user-1");
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/devices",
                Some(&auth),
                r#"{"name":"Desk Lamp","ip":"192.168.1.77","type":"light","room":"Study"}"#,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["type"], "light");
        assert_eq!(body["data"]["room"], "Study");
        assert_eq!(body["data"]["ownerId"], "user-1");
        let device_id = body["data"]["deviceId"]
            .as_str()
            .expect("device id")
            .to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/devices/{device_id}"),
                Some(&auth),
                r#"{"name":"Desk Lamp 2"}"#,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["name"], "Desk Lamp 2");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/devices/{device_id}"))
                    .header(header::AUTHORIZATION, &auth)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get("/api/devices", Some(&auth)))
            .await
            .expect("response");
        let body = body_json(response).await;
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn claim_conflict_yields_conflict_code() {
        let (state, _, _) = test_state();
        let first = bearer(&state, "user-1");
        let second = bearer(&state, "user-2");
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/devices/register",
                None,
                r#"{"mac":"AA:BB:CC:DD:EE:02","ip":"192.168.1.62"}"#,
            ))
            .await
            .expect("response");
        let body = body_json(response).await;
        let device_id = body["data"]["device"]["deviceId"]
            .as_str()
            .expect("device id")
            .to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/devices/claim/{device_id}"),
                Some(&first),
                "{}",
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/devices/claim/{device_id}"),
                Some(&second),
                "{}",
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "CLAIM.ALREADY_OWNED");
    }

    #[tokio::test]
    async fn status_reflects_cached_telemetry() {
        let (state, store, _) = test_state();
        let owner = bearer(&state, "user-1");
        let foreign = bearer(&state, "user-2");
        let app = create_router(state);

        let mac = Mac::parse("AA:BB:CC:DD:EE:03").expect("mac");
        let now = now_epoch_ms();
        store
            .insert(DeviceRecord {
                device_id: "dev-status".to_string(),
                mac: Some(mac.clone()),
                ip: None,
                name: "Hub".to_string(),
                kind: DeviceKind::Hub,
                room: "Living Room".to_string(),
                owner_id: Some("user-1".to_string()),
                status: PowerState::Off,
                channels: vec![Channel {
                    index: 2,
                    name: "relay-2".to_string(),
                    room: "Living Room".to_string(),
                    state: PowerState::Off,
                }],
                telemetry: TelemetryState::default(),
                firmware_version: None,
                settings_password: None,
                created_at_ms: now,
                updated_at_ms: now,
            })
            .await
            .expect("insert");
        store
            .merge_report(
                &mac,
                TelemetryUpdate {
                    temperature_c: Some(26.5),
                    gas_level: Some(2400),
                    door: Some(PowerState::On),
                    channel_states: vec![(2, PowerState::On)],
                    reported_at_ms: 1_700_000_000_000,
                    ..Default::default()
                },
            )
            .await
            .expect("merge");

        let response = app
            .clone()
            .oneshot(get("/api/status/dev-status", Some(&owner)))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["temp"], 26.5);
        assert_eq!(body["data"]["temperature"], 26.5);
        assert_eq!(body["data"]["gasAlert"], true);
        assert_eq!(body["data"]["door"], "open");
        assert_eq!(body["data"]["relay1"], "off");
        assert_eq!(body["data"]["relay2"], "on");
        assert_eq!(body["data"]["source"], "cache");
        assert_eq!(body["data"]["lastUpdate"], 1_700_000_000_000i64);

        let response = app
            .oneshot(get("/api/status/dev-status", Some(&foreign)))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn control_requires_ownership() {
        let (state, _, _) = test_state();
        let auth = bearer(&state, "user-1");
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/devices/register",
                None,
                r#"{"mac":"AA:BB:CC:DD:EE:04","ip":"192.168.1.64"}"#,
            ))
            .await
            .expect("response");
        let body = body_json(response).await;
        let device_id = body["data"]["device"]["deviceId"]
            .as_str()
            .expect("device id")
            .to_string();

        // 未认领设备不可控
        let control = format!(
            r#"{{"deviceId":"{device_id}","device":"door","action":"open"}}"#
        );
        let response = app
            .oneshot(json_request("POST", "/api/control", Some(&auth), &control))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "CLAIM.FORBIDDEN");
    }

    #[tokio::test]
    async fn manual_probe_on_dead_address_is_not_found() {
        let (state, _, _) = test_state();
        let auth = bearer(&state, "user-1");
        let app = create_router(state);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/scan/manual",
                Some(&auth),
                r#"{"ip":"127.0.0.1:1"}"#,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_snapshot_is_exposed() {
        let (state, _, _) = test_state();
        let app = create_router(state);
        let response = app.oneshot(get("/metrics", None)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        // 计数器是进程级静态量，只断言字段形状
        assert!(body["data"]["reportsIngested"].is_u64());
        assert!(body["data"]["commandsPubsub"].is_u64());
        assert!(body["data"]["scanProbes"].is_u64());
    }
}
