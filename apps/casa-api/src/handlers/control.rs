//! 指令下发 handler
//!
//! - POST /api/control
//!
//! 路由决策在 `casa-control`：有 MAC 走 broker 指令主题，否则按 IP
//! 直连固件 `/control`。此处只做认证、归属检查与结果映射。

use crate::AppState;
use crate::middleware::require_caller;
use crate::utils::response::{command_error, forbidden_error, not_found_error, storage_error};
use api_contract::{ApiResponse, ControlRequest, ControlResponse};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use casa_control::{CommandRequest, Dispatched};

/// 下发一条设备指令
///
/// # 参数
///
/// - `req`: 请求体（deviceId、device=执行器名、action 必填，
///   value/channel 按指令语义可选）
///
/// # 返回
///
/// - broker 入队：`{"outcome":"queued","topic":"cmd/..."}`
/// - HTTP 直连：`{"outcome":"delivered","reply":<设备应答原文>}`
///
/// # 错误处理
///
/// - `400 BAD REQUEST`: 设备无任何可达地址（DEVICE.NOT_CONFIGURED）
/// - `401 UNAUTHORIZED`: 认证失败
/// - `403 FORBIDDEN`: 设备非当前用户认领
/// - `404 NOT FOUND`: 设备不存在
/// - `502 BAD GATEWAY`: broker 掉线或设备直连失败（DEVICE.UNREACHABLE）
/// - `504 GATEWAY TIMEOUT`: 设备应答超时（DEVICE.TIMEOUT）
pub async fn control_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ControlRequest>,
) -> Response {
    let ctx = match require_caller(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    // 下发要求明确归属：未认领设备先 claim 再控
    let record = match state.store.find_by_id(&req.device_id).await {
        Ok(Some(record)) => record,
        Ok(None) => return not_found_error(),
        Err(err) => return storage_error(err),
    };
    if !record.owned_by(&ctx.user_id) {
        return forbidden_error();
    }
    let request = CommandRequest {
        device_id: req.device_id,
        target: req.device,
        action: req.action,
        value: req.value,
        channel: req.channel,
    };
    match state.commands.dispatch(request).await {
        Ok(Dispatched::Queued { topic }) => (
            StatusCode::OK,
            Json(ApiResponse::success(ControlResponse {
                outcome: "queued".to_string(),
                topic: Some(topic),
                reply: None,
            })),
        )
            .into_response(),
        Ok(Dispatched::Delivered { reply }) => (
            StatusCode::OK,
            Json(ApiResponse::success(ControlResponse {
                outcome: "delivered".to_string(),
                topic: None,
                reply: Some(reply),
            })),
        )
            .into_response(),
        Err(err) => command_error(err),
    }
}
