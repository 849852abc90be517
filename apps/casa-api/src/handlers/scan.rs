//! 设备发现 handlers
//!
//! - GET /api/scan - 横扫本机 /24 子网，枚举应答家族身份的设备
//! - POST /api/scan/manual - 探测指定地址（跨网段或 AP 隔离场景）
//!
//! 扫描只读不写：候选列表由用户决定后续动作（创建/认领），
//! 注册表不因扫描自动变化。

use crate::AppState;
use crate::middleware::require_caller;
use crate::utils::normalize_required;
use crate::utils::response::{discovered_to_dto, not_found_error, scan_error};
use api_contract::{ApiResponse, DiscoveredDeviceDto, ScanManualRequest};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

/// 扫描本地子网
///
/// mDNS 名称先探一轮，再并发横扫 .2-.254；结果按 IP 去重排序。
/// 内网横扫一轮通常在探测超时的量级内返回。
pub async fn scan_network(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_caller(&state, &headers) {
        return response;
    }
    match state.scanner.scan_local_subnet().await {
        Ok(devices) => {
            let data: Vec<DiscoveredDeviceDto> =
                devices.into_iter().map(discovered_to_dto).collect();
            (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => scan_error(err),
    }
}

/// 手工探测单个地址
///
/// 地址上没有家族设备（连不上、应答不对、身份不符）统一按
/// `404 RESOURCE.NOT_FOUND` 返回。
pub async fn scan_manual(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ScanManualRequest>,
) -> Response {
    if let Err(response) = require_caller(&state, &headers) {
        return response;
    }
    let ip = match normalize_required(req.ip, "ip") {
        Ok(value) => value,
        Err(response) => return response,
    };
    match state.scanner.probe_address(&ip).await {
        Some(device) => (
            StatusCode::OK,
            Json(ApiResponse::success(discovered_to_dto(device))),
        )
            .into_response(),
        None => not_found_error(),
    }
}
