//! 设备 CRUD handlers
//!
//! 提供设备资源的增删改查接口：
//! - GET /api/devices - 列出当前用户认领的设备
//! - POST /api/devices - 手动创建设备（通常来自扫描候选）
//! - PUT /api/devices/{device_id} - 更新设备
//! - DELETE /api/devices/{device_id} - 删除设备
//!
//! 权限要求：
//! - 所有接口需要 Bearer token 认证
//! - 更新/删除受归属保护：设备已被其他用户认领时拒绝
//! - 未认领设备允许任何已认证用户整理（改名、分房间、删除）

use crate::AppState;
use crate::middleware::require_caller;
use crate::utils::response::{
    bad_request_error, device_to_dto, forbidden_error, not_found_error, storage_error,
};
use crate::utils::{normalize_optional, normalize_required, parse_mac};
use api_contract::{ApiResponse, CreateDeviceRequest, DeviceDto, UpdateDeviceRequest};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use casa_storage::DeviceUpdate;
use domain::{
    CallerContext, Channel, DEFAULT_ROOM, DeviceKind, DeviceRecord, PowerState, TelemetryState,
    now_epoch_ms,
};
use uuid::Uuid;

/// 归属保护：设备被其他用户认领时拒绝操作
pub(crate) fn ensure_not_foreign(record: &DeviceRecord, ctx: &CallerContext) -> Result<(), Response> {
    if record.is_claimed() && !record.owned_by(&ctx.user_id) {
        return Err(forbidden_error());
    }
    Ok(())
}

/// 列出设备
///
/// 查询当前用户认领的所有设备。
///
/// # 参数
///
/// - `state`: 应用状态，包含 `store` 存储实例
/// - `headers`: HTTP 请求头，用于提取 Bearer token 进行认证
///
/// # 返回
///
/// 成功时返回 `200 OK` 和设备列表，失败时返回相应的错误响应。
///
/// # 错误处理
///
/// - `401 UNAUTHORIZED`: 认证失败（token 无效或过期）
/// - `500 INTERNAL SERVER ERROR`: 存储层错误
pub async fn list_devices(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = match require_caller(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match state.store.list_owned_by(&ctx.user_id).await {
        Ok(items) => {
            let data: Vec<DeviceDto> = items.into_iter().map(device_to_dto).collect();
            (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => storage_error(err),
    }
}

/// 创建设备
///
/// 手动登记一台设备，通常搭配扫描结果使用：用户从扫描候选中挑一台，
/// 带 IP（可选带 MAC）提交。创建的记录直接归属当前用户。
///
/// # 参数
///
/// - `state`: 应用状态，包含 `store` 存储实例
/// - `headers`: HTTP 请求头，用于提取 Bearer token 进行认证
/// - `req`: 请求体，包含设备创建信息（name 必填，mac/ip/type/room 可选）
///
/// # 返回
///
/// 成功时返回 `200 OK` 和创建的设备信息，失败时返回相应的错误响应。
///
/// # 流程
///
/// 1. 调用 `require_caller` 验证 Bearer token
/// 2. 使用 `normalize_required` 验证必填字段（name）
/// 3. 如携带 MAC：解析规范化，并检查是否已被注册
/// 4. 生成新的设备 ID（UUID v4），类别按 type 字段宽松解析
/// 5. 创建 `DeviceRecord` 并调用 `store.insert` 保存
///
/// # 错误处理
///
/// - `400 BAD REQUEST`: 必填字段缺失、MAC 非法或已被注册
/// - `401 UNAUTHORIZED`: 认证失败
/// - `500 INTERNAL SERVER ERROR`: 存储层错误
pub async fn create_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateDeviceRequest>,
) -> Response {
    let ctx = match require_caller(&state, &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let name = match normalize_required(req.name, "name") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let ip = match normalize_optional(req.ip, "ip") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let mac = match req.mac {
        Some(raw) => match parse_mac(&raw) {
            Ok(mac) => Some(mac),
            Err(response) => return response,
        },
        None => None,
    };
    if let Some(mac) = &mac {
        match state.store.find_by_mac(mac).await {
            Ok(Some(_)) => return bad_request_error("mac already registered"),
            Ok(None) => {}
            Err(err) => return storage_error(err),
        }
    }
    let now = now_epoch_ms();
    let record = DeviceRecord {
        device_id: Uuid::new_v4().to_string(),
        mac,
        ip,
        name,
        kind: req
            .kind
            .as_deref()
            .map(DeviceKind::parse)
            .unwrap_or_default(),
        room: req.room.unwrap_or_else(|| DEFAULT_ROOM.to_string()),
        owner_id: Some(ctx.user_id.clone()),
        status: PowerState::Off,
        channels: Vec::new(),
        telemetry: TelemetryState::default(),
        firmware_version: None,
        settings_password: None,
        created_at_ms: now,
        updated_at_ms: now,
    };
    match state.store.insert(record).await {
        Ok(item) => (
            StatusCode::OK,
            Json(ApiResponse::success(device_to_dto(item))),
        )
            .into_response(),
        Err(err) => storage_error(err),
    }
}

/// 更新设备
///
/// 更新指定设备的信息。支持改名、改类别、改房间、改 IP、换通道拓扑、
/// 设固件版本与设置口令，至少需要提供一个更新字段。
///
/// # 参数
///
/// - `state`: 应用状态，包含 `store` 存储实例
/// - `device_id`: 路径参数
/// - `headers`: HTTP 请求头，用于提取 Bearer token 进行认证
/// - `req`: 请求体，所有字段可选
///
/// # 返回
///
/// 成功时返回 `200 OK` 和更新后的设备信息，设备不存在时返回 `404 NOT FOUND`。
///
/// # 流程
///
/// 1. 调用 `require_caller` 验证 Bearer token
/// 2. 查找设备并做归属保护检查
/// 3. 使用 `normalize_optional` 验证可选字段
/// 4. 检查是否至少有一个更新字段
/// 5. 调用 `store.update` 更新设备
///
/// # 错误处理
///
/// - `400 BAD REQUEST`: 没有提供更新字段或字段格式错误
/// - `401 UNAUTHORIZED`: 认证失败
/// - `403 FORBIDDEN`: 设备已被其他用户认领
/// - `404 NOT FOUND`: 设备不存在
/// - `500 INTERNAL SERVER ERROR`: 存储层错误
pub async fn update_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateDeviceRequest>,
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
    let name = match normalize_optional(req.name, "name") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let room = match normalize_optional(req.room, "room") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let ip = match normalize_optional(req.ip, "ip") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let kind = req.kind.as_deref().map(DeviceKind::parse);
    let channels = req.channels.map(|channels| {
        channels
            .into_iter()
            .map(|channel| Channel {
                index: channel.index,
                name: channel.name,
                room: channel.room,
                state: PowerState::from_wire(&channel.state),
            })
            .collect::<Vec<_>>()
    });
    let firmware_version = req.firmware_version;
    let settings_password = req.settings_password;
    if name.is_none()
        && kind.is_none()
        && room.is_none()
        && ip.is_none()
        && channels.is_none()
        && firmware_version.is_none()
        && settings_password.is_none()
    {
        return bad_request_error("empty update");
    }
    let update = DeviceUpdate {
        name,
        kind,
        room,
        ip,
        channels,
        firmware_version,
        settings_password,
    };
    match state.store.update(&device_id, update).await {
        Ok(Some(item)) => (
            StatusCode::OK,
            Json(ApiResponse::success(device_to_dto(item))),
        )
            .into_response(),
        Ok(None) => not_found_error(),
        Err(err) => storage_error(err),
    }
}

/// 删除设备
///
/// 删除指定的设备。未认领或归属当前用户的设备可删；
/// 已被其他用户认领的设备拒绝。
///
/// # 返回
///
/// 成功时返回 `200 OK` 和空数据，设备不存在时返回 `404 NOT FOUND`。
///
/// # 错误处理
///
/// - `401 UNAUTHORIZED`: 认证失败
/// - `403 FORBIDDEN`: 设备已被其他用户认领
/// - `404 NOT FOUND`: 设备不存在
/// - `500 INTERNAL SERVER ERROR`: 存储层错误
pub async fn delete_device(
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
    match state.store.delete(&device_id).await {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::success(()))).into_response(),
        Ok(false) => not_found_error(),
        Err(err) => storage_error(err),
    }
}
