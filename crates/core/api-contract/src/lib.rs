//! 稳定的 DTO 与 API 响应契约。

use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 通道结构，返回与更新共用（`state` 用线上词汇 `"on"`/`"off"`）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDto {
    pub index: i32,
    pub name: String,
    pub room: String,
    pub state: String,
}

/// 设备返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDto {
    pub device_id: String,
    /// 规范形式 `AA:BB:CC:DD:EE:FF`；手工录入的设备可能为空。
    pub mac: Option<String>,
    pub ip: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub room: String,
    pub owner_id: Option<String>,
    pub status: String,
    pub channels: Vec<ChannelDto>,
    pub firmware_version: Option<String>,
    pub last_update_ms: Option<i64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// 设备自动注册请求体（固件心跳携带，无凭据）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub mac: String,
    pub ip: String,
    pub name: Option<String>,
    /// 旧固件字段名为 `firmware`。
    #[serde(alias = "firmware")]
    pub firmware_version: Option<String>,
}

/// 注册应答；`outcome` 标记走了哪条路径（updated/linked/registered）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDto {
    pub outcome: String,
    pub device: DeviceDto,
}

/// 手工创建设备请求体（来源于扫描候选或人工录入）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceRequest {
    pub name: String,
    pub mac: Option<String>,
    pub ip: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub room: Option<String>,
}

/// 设备更新请求体，缺省字段不动。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeviceRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub room: Option<String>,
    pub ip: Option<String>,
    pub firmware_version: Option<String>,
    pub settings_password: Option<String>,
    /// 携带时整体替换通道拓扑。
    pub channels: Option<Vec<ChannelDto>>,
}

/// 按 MAC 认领请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimByMacRequest {
    pub mac: String,
}

/// 指令下发请求体；`device` 与固件 `/control` 的执行器词汇一致。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub device_id: String,
    pub device: String,
    pub action: String,
    pub value: Option<i64>,
    pub channel: Option<i64>,
}

/// 指令下发应答。
///
/// `outcome` 为 `"queued"`（broker 入队）或 `"delivered"`（HTTP 直连
/// 已应答）；`reply` 透传设备应答原文。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResponse {
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<serde_json::Value>,
}

/// 缓存状态应答，镜像固件 `GET /status` 的字段形状。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDto {
    /// 与 `temp` 互为别名，双字段同时输出，新旧客户端各取所需。
    pub temperature: Option<f64>,
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub gas: Option<i64>,
    pub gas_alert: bool,
    pub rain: String,
    pub door: String,
    pub screen: Option<i64>,
    pub relay1: String,
    pub relay2: String,
    pub relay3: String,
    pub relay4: String,
    pub auto_light: bool,
    pub auto_mode: bool,
    pub light: Option<i64>,
    pub last_update: Option<i64>,
    /// 云侧测不到的字段按固件形状补零。
    pub wifi: i64,
    pub uptime: i64,
    pub source: String,
}

/// 扫描候选返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredDeviceDto {
    pub ip: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// 手工探测请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanManualRequest {
    pub ip: String,
}

/// 进程内计数器快照，`GET /metrics` 的响应体。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub reports_ingested: u64,
    pub reports_dropped_unknown: u64,
    pub reports_dropped_invalid: u64,
    pub commands_pubsub: u64,
    pub commands_http: u64,
    pub commands_failed: u64,
    pub command_latency_ms_total: u64,
    pub command_latency_ms_count: u64,
    pub devices_registered: u64,
    pub devices_linked: u64,
    pub heartbeats: u64,
    pub scan_probes: u64,
    pub scan_hits: u64,
}
