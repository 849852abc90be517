//! MQTT 主题约定

use domain::Mac;

/// 指令下发主题前缀，完整主题为 `cmd/<MAC段>`。
pub const COMMAND_TOPIC_PREFIX: &str = "cmd";

/// 状态上报主题前缀，设备发布到 `device/status/<MAC段>`。
pub const STATUS_TOPIC_PREFIX: &str = "device/status";

/// 指令主题：`cmd/AABBCCDDEEFF`。
///
/// 主题中的 MAC 统一使用无分隔大写形式，注册表规范形式（带冒号）
/// 不进入主题，两种渲染都由 [`Mac`] 导出。
pub fn command_topic(mac: &Mac) -> String {
    format!("{}/{}", COMMAND_TOPIC_PREFIX, mac.topic_segment())
}

/// 状态上报的通配订阅：`device/status/#`。
pub fn status_topic_filter() -> String {
    format!("{STATUS_TOPIC_PREFIX}/#")
}

/// 从状态主题提取 MAC。
///
/// 容忍两种书写形式（带冒号 / 无分隔）；前缀不符或 MAC 非法返回 `None`。
pub fn mac_from_status_topic(topic: &str) -> Option<Mac> {
    let suffix = topic
        .strip_prefix(STATUS_TOPIC_PREFIX)?
        .strip_prefix('/')?;
    if suffix.is_empty() {
        return None;
    }
    Mac::parse(suffix).ok()
}
