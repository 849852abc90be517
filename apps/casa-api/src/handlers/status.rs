//! 缓存状态查询 handler
//!
//! - GET /api/status/{device_id}
//!
//! 纯缓存读：返回注册表里最近一次遥测合并的结果，不触发任何
//! 设备交互。应答形状镜像固件 `GET /status`，老客户端可直接换路径。

use crate::AppState;
use crate::handlers::devices::ensure_not_foreign;
use crate::middleware::require_caller;
use crate::utils::response::{not_found_error, status_to_dto, storage_error};
use api_contract::ApiResponse;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

/// 查询设备缓存状态
///
/// 未认领设备允许任何已认证用户查看（认领前预览），
/// 已被其他用户认领的设备拒绝。
pub async fn device_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let ctx = match require_caller(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let record = match state.store.find_by_id(&device_id).await {
        Ok(Some(record)) => record,
        Ok(None) => return not_found_error(),
        Err(err) => return storage_error(err),
    };
    if let Err(response) = ensure_not_foreign(&record, &ctx) {
        return response;
    }
    (
        StatusCode::OK,
        Json(ApiResponse::success(status_to_dto(&record))),
    )
        .into_response()
}
