//! HTTP 响应辅助函数和 DTO 转换
//!
//! 提供统一的错误响应构造函数和 DTO 转换函数：
//! - 错误响应：auth_error, forbidden_error, bad_request_error, not_found_error,
//!   internal_auth_error, storage_error, command_error, provision_error, scan_error
//! - DTO 转换：device_to_dto, status_to_dto, discovered_to_dto
//!
//! 设计原则：
//! - 所有错误返回统一的 ApiResponse 格式
//! - HTTP 状态码与错误码对应
//! - 指令/认领/扫描错误按语义映射到 4xx/5xx

use api_contract::{ApiResponse, ChannelDto, DeviceDto, DiscoveredDeviceDto, StatusDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use casa_auth::AuthError;
use casa_control::CommandError;
use casa_discovery::{DiscoveredDevice, ScanError};
use casa_protocol::gas_alert;
use casa_provision::ProvisionError;
use casa_storage::StorageError;
use domain::{DeviceRecord, PowerState, RainState};

/// 认证错误响应
pub fn auth_error(status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()>::error(
            "AUTH.UNAUTHORIZED",
            "unauthorized",
        )),
    )
        .into_response()
}

/// 禁止访问错误响应（设备归属他人）
pub fn forbidden_error() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ApiResponse::<()>::error("CLAIM.FORBIDDEN", "forbidden")),
    )
        .into_response()
}

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", "not found")),
    )
        .into_response()
}

/// 认证内部错误响应
pub fn internal_auth_error(err: AuthError) -> Response {
    let message = err.to_string();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", message)),
    )
        .into_response()
}

/// 存储错误响应
pub fn storage_error(err: StorageError) -> Response {
    let message = err.to_string();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", message)),
    )
        .into_response()
}

/// 指令下发错误响应：按失败语义映射状态码
pub fn command_error(err: CommandError) -> Response {
    let (status, code) = match &err {
        CommandError::NotFound => (StatusCode::NOT_FOUND, "RESOURCE.NOT_FOUND"),
        CommandError::NotConfigured => (StatusCode::BAD_REQUEST, "DEVICE.NOT_CONFIGURED"),
        CommandError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "DEVICE.TIMEOUT"),
        CommandError::Unreachable(_) => (StatusCode::BAD_GATEWAY, "DEVICE.UNREACHABLE"),
        CommandError::Payload(_) => (StatusCode::BAD_REQUEST, "INVALID.REQUEST"),
        CommandError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL.ERROR"),
    };
    let message = err.to_string();
    (status, Json(ApiResponse::<()>::error(code, message))).into_response()
}

/// 认领/释放错误响应
pub fn provision_error(err: ProvisionError) -> Response {
    let (status, code) = match &err {
        ProvisionError::NotFound => (StatusCode::NOT_FOUND, "RESOURCE.NOT_FOUND"),
        ProvisionError::AlreadyOwned => (StatusCode::CONFLICT, "CLAIM.ALREADY_OWNED"),
        ProvisionError::NotOwner => (StatusCode::FORBIDDEN, "CLAIM.FORBIDDEN"),
        ProvisionError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL.ERROR"),
    };
    let message = err.to_string();
    (status, Json(ApiResponse::<()>::error(code, message))).into_response()
}

/// 扫描错误响应
pub fn scan_error(err: ScanError) -> Response {
    let message = err.to_string();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("SCAN.FAILED", message)),
    )
        .into_response()
}

/// DeviceRecord 转 DeviceDto
pub fn device_to_dto(record: DeviceRecord) -> DeviceDto {
    DeviceDto {
        device_id: record.device_id,
        mac: record.mac.map(|mac| mac.to_string()),
        ip: record.ip,
        name: record.name,
        kind: record.kind.as_str().to_string(),
        room: record.room,
        owner_id: record.owner_id,
        status: record.status.as_str().to_string(),
        channels: record
            .channels
            .into_iter()
            .map(|channel| ChannelDto {
                index: channel.index,
                name: channel.name,
                room: channel.room,
                state: channel.state.as_str().to_string(),
            })
            .collect(),
        firmware_version: record.firmware_version,
        last_update_ms: record.telemetry.last_update_ms,
        created_at_ms: record.created_at_ms,
        updated_at_ms: record.updated_at_ms,
    }
}

/// DeviceRecord 转 StatusDto：镜像固件 `GET /status` 的应答形状
///
/// 继电器按通道序号映射到 relay1..relay4，没上报过的通道补 "off"；
/// 云侧测不到的 wifi/uptime 字段按固件形状补零，source 固定 "cache"。
pub fn status_to_dto(record: &DeviceRecord) -> StatusDto {
    let telemetry = &record.telemetry;
    let relay = |index: i32| -> String {
        record
            .channels
            .iter()
            .find(|channel| channel.index == index)
            .map(|channel| channel.state.as_str().to_string())
            .unwrap_or_else(|| PowerState::Off.as_str().to_string())
    };
    StatusDto {
        temperature: telemetry.temperature_c,
        temp: telemetry.temperature_c,
        humidity: telemetry.humidity_pct,
        gas: telemetry.gas_level,
        gas_alert: gas_alert(telemetry.gas_level.unwrap_or(0)),
        rain: telemetry.rain.unwrap_or(RainState::Dry).as_str().to_string(),
        door: match record.status {
            PowerState::On => "open".to_string(),
            PowerState::Off => "closed".to_string(),
        },
        screen: telemetry.screen_mode,
        relay1: relay(1),
        relay2: relay(2),
        relay3: relay(3),
        relay4: relay(4),
        auto_light: telemetry.auto_light.unwrap_or(false),
        auto_mode: telemetry.auto_mode.unwrap_or(false),
        light: telemetry.light_level,
        last_update: telemetry.last_update_ms,
        wifi: 0,
        uptime: 0,
        source: "cache".to_string(),
    }
}

/// DiscoveredDevice 转 DiscoveredDeviceDto
pub fn discovered_to_dto(device: DiscoveredDevice) -> DiscoveredDeviceDto {
    DiscoveredDeviceDto {
        ip: device.ip,
        name: device.name,
        kind: device.kind,
    }
}
