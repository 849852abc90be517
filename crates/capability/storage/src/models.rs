//! 数据模型
//!
//! 设备记录本身定义在 `domain`，此处定义存储操作的输入与结果类型：
//! - 手动更新输入：DeviceUpdate
//! - 自动注册输入：RegistrationUpdate
//! - 认领/释放结果：ClaimOutcome, ReleaseOutcome

use domain::{Channel, DeviceKind, DeviceRecord};

/// 设备手动更新输入；`None` 字段保持原值。
///
/// MAC 不在其中：物理身份只能由自动注册的挂接路径写入。
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub kind: Option<DeviceKind>,
    pub room: Option<String>,
    pub ip: Option<String>,
    /// `Some` 时整体替换通道拓扑。
    pub channels: Option<Vec<Channel>>,
    pub firmware_version: Option<String>,
    pub settings_password: Option<String>,
}

/// 设备自动注册（心跳/挂接）时刷新的字段。
#[derive(Debug, Clone)]
pub struct RegistrationUpdate {
    /// 本次上报的 IP，总是写入。
    pub ip: String,
    pub name: Option<String>,
    pub firmware_version: Option<String>,
}

/// 认领结果。
#[derive(Debug)]
pub enum ClaimOutcome {
    /// 认领成功；同一用户重复认领也返回此值（幂等）。
    Claimed(DeviceRecord),
    /// 已被其他用户认领。
    AlreadyOwned,
    /// 设备不存在。
    NotFound,
}

/// 释放结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    /// 调用方不是当前归属用户。
    NotOwner,
    NotFound,
}
