pub mod device;
pub mod mac;

pub use device::{
    Channel, DEFAULT_ROOM, DeviceKind, DeviceRecord, PowerState, RainState, TelemetryState,
    TelemetryUpdate,
};
pub use mac::{Mac, MacParseError};

/// 调用方上下文：经过认证的请求身份，所有受保护操作共享。
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub user_id: String,
}

impl CallerContext {
    /// 构造显式身份的调用方上下文。
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl Default for CallerContext {
    /// 空上下文（仅用于测试或占位）。
    fn default() -> Self {
        Self {
            user_id: "".to_string(),
        }
    }
}

/// 当前 Unix 时间戳（毫秒）。
pub fn now_epoch_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or_default()
}
