//! 设备入网与归属 handlers
//!
//! - POST /api/devices/register - 设备自注册心跳（无认证，固件不持凭据）
//! - GET /api/devices/unclaimed - 列出可认领设备
//! - POST /api/devices/claim/{device_id} - 按 id 认领
//! - POST /api/devices/claim-by-mac - 按 MAC 认领
//! - POST /api/devices/release/{device_id} - 释放归属
//!
//! 自注册三分支（MAC 命中刷新 / IP 挂接 / 新建）由 `casa-provision`
//! 的 Registrar 决定，此处只做输入校验与 DTO 转换。

use crate::AppState;
use crate::middleware::require_caller;
use crate::utils::response::{device_to_dto, provision_error};
use crate::utils::{normalize_optional, normalize_required, parse_mac};
use api_contract::{
    ApiResponse, ClaimByMacRequest, DeviceDto, RegisterDeviceRequest, RegistrationDto,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use casa_provision::RegistrationRequest;

/// 设备自注册
///
/// 固件开机与周期心跳都打到这里。按 MAC 归并：已注册则刷新 IP/名称/
/// 固件版本；IP 命中无 MAC 的手工记录则挂接 MAC；否则新建未认领记录。
///
/// # 参数
///
/// - `state`: 应用状态，包含 `registrar` 注册服务
/// - `req`: 请求体（mac、ip 必填，name、firmware 可选）
///
/// # 返回
///
/// 统一返回 `200 OK`，应答携带 `outcome`（updated/linked/registered）
/// 与合并后的设备记录；固件对三种结果同样处理。
///
/// # 错误处理
///
/// - `400 BAD REQUEST`: MAC 非法或 ip 为空
/// - `500 INTERNAL SERVER ERROR`: 存储层错误
pub async fn register_device(
    State(state): State<AppState>,
    Json(req): Json<RegisterDeviceRequest>,
) -> Response {
    let mac = match parse_mac(&req.mac) {
        Ok(mac) => mac,
        Err(response) => return response,
    };
    let ip = match normalize_required(req.ip, "ip") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let name = match normalize_optional(req.name, "name") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let firmware_version = match normalize_optional(req.firmware_version, "firmware") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let request = RegistrationRequest {
        mac,
        ip,
        name,
        firmware_version,
    };
    match state.registrar.register_or_update(request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(RegistrationDto {
                outcome: outcome.kind.as_str().to_string(),
                device: device_to_dto(outcome.record),
            })),
        )
            .into_response(),
        Err(err) => provision_error(err),
    }
}

/// 列出未认领设备
pub async fn list_unclaimed(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_caller(&state, &headers) {
        return response;
    }
    match state.claims.list_unclaimed().await {
        Ok(items) => {
            let data: Vec<DeviceDto> = items.into_iter().map(device_to_dto).collect();
            (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => provision_error(err),
    }
}

/// 按设备 id 认领
///
/// 认领是条件更新：归属为空或已是本人时写入，并发抢认同一台设备
/// 只会有一个赢家，输家收到 `409 CLAIM.ALREADY_OWNED`。
pub async fn claim_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let ctx = match require_caller(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match state.claims.claim(&ctx, &device_id).await {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(device_to_dto(record))),
        )
            .into_response(),
        Err(err) => provision_error(err),
    }
}

/// 按 MAC 认领（扫描候选可直接认领）
pub async fn claim_device_by_mac(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ClaimByMacRequest>,
) -> Response {
    let ctx = match require_caller(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let mac = match parse_mac(&req.mac) {
        Ok(mac) => mac,
        Err(response) => return response,
    };
    match state.claims.claim_by_mac(&ctx, &mac).await {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(device_to_dto(record))),
        )
            .into_response(),
        Err(err) => provision_error(err),
    }
}

/// 释放归属
///
/// 仅当前归属用户可释放；释放后设备回到未认领池。
pub async fn release_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let ctx = match require_caller(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match state.claims.release(&ctx, &device_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({ "released": true }))),
        )
            .into_response(),
        Err(err) => provision_error(err),
    }
}
