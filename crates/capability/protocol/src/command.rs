//! 指令报文

use domain::PowerState;
use serde::{Deserialize, Serialize};

/// 下发给设备的指令，MQTT 与 HTTP 直连共用同一报文。
///
/// 执行器词汇表（固件 `/control` 处理器接受的取值）：
/// - `door` / `servo`：`open`、`close`
/// - `buzzer` / `alarm`：`beep`、`alert`
/// - `screen` / `display`：`value` 取 0..=2
/// - `relay` / `light`：`on`、`off`，`channel` 取 1..=4
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandPayload {
    /// 目标执行器。
    pub device: String,
    /// 动作。
    pub action: String,
    /// 数值参数（屏幕页号等），缺省时不序列化。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    /// 通道号（继电器 1..=4），缺省时不序列化。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<i64>,
}

/// 门/舵机类指令对应的乐观状态更新。
///
/// `open` → 开，`close` → 关；其余动作不触发更新，等待设备上报纠正。
pub fn latch_update(payload: &CommandPayload) -> Option<PowerState> {
    if !matches!(payload.device.as_str(), "door" | "servo") {
        return None;
    }
    match payload.action.as_str() {
        "open" => Some(PowerState::On),
        "close" => Some(PowerState::Off),
        _ => None,
    }
}

/// 继电器/灯控指令对应的通道乐观状态更新。
pub fn channel_update(payload: &CommandPayload) -> Option<(i32, PowerState)> {
    if !matches!(payload.device.as_str(), "relay" | "light") {
        return None;
    }
    let channel = payload.channel?;
    if !(1..=4).contains(&channel) {
        return None;
    }
    match payload.action.as_str() {
        "on" => Some((channel as i32, PowerState::On)),
        "off" => Some((channel as i32, PowerState::Off)),
        _ => None,
    }
}
