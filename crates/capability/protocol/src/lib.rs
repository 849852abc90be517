//! # 设备线协议模块
//!
//! 固化与 ESP32 智能家居控制器通信的全部线上约定，两条链路共用：
//! - **MQTT**：指令主题 `cmd/<MAC>`、状态上报主题 `device/status/<MAC>`
//! - **HTTP 直连**：`GET /scan` 探测、`POST /control` 控制、`GET /status` 查询
//!
//! ## 报文走向
//!
//! ```text
//! CommandPayload ── publish ──▶ cmd/AABBCCDDEEFF        (QoS 1)
//!                └── POST ────▶ http://<ip>/control     (设备无 MAC 时回退)
//!
//! device/status/AABBCCDDEEFF ──▶ StatusReport ──▶ TelemetryUpdate ──▶ 注册表
//! http://<ip>/scan           ──▶ ProbeReply   ──▶ 发现候选
//! ```
//!
//! 固件另有一条门禁链路：刷卡事件直接 `POST /api/access-logs`（携带
//! `deviceMac`、`cardUID`、`accessGranted`），由门禁子系统承接，不经过本服务。
//!
//! 字段名、阈值与路径均为固件侧既定事实，改动任何一处都意味着固件升级。

mod command;
mod probe;
mod report;
mod topics;

pub use command::{CommandPayload, channel_update, latch_update};
pub use probe::{
    CONTROL_PATH, MDNS_HOST, PROBE_IDENTITY, ProbeReply, SCAN_PATH, STATUS_PATH, control_url,
    default_device_name, scan_url, status_url,
};
pub use report::{GAS_ALERT_THRESHOLD, StatusReport, gas_alert};
pub use topics::{
    COMMAND_TOPIC_PREFIX, STATUS_TOPIC_PREFIX, command_topic, mac_from_status_topic,
    status_topic_filter,
};
