//! 存储接口 Trait 定义
//!
//! 设备注册表的唯一数据入口：
//! - 查找：按 id / MAC / IP，按归属列举
//! - 写入：插入、手动更新、删除
//! - 自动注册：心跳刷新、MAC 挂接
//! - 归属变更：条件更新实现的认领/释放
//! - 遥测：按 MAC 合并上报、乐观状态写入
//!
//! 设计原则：
//! - 所有按 MAC 的操作接收 [`domain::Mac`]，规范化由类型保证
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use crate::models::{ClaimOutcome, DeviceUpdate, RegistrationUpdate, ReleaseOutcome};
use async_trait::async_trait;
use domain::{DeviceRecord, Mac, PowerState, TelemetryUpdate};

/// 设备注册表存储接口
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// 按内部 id 查找设备
    async fn find_by_id(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError>;

    /// 按规范化 MAC 查找设备
    async fn find_by_mac(&self, mac: &Mac) -> Result<Option<DeviceRecord>, StorageError>;

    /// 按 IP 查找设备（IP 会漂移，仅用于注册合并与路由，不作长期键）
    async fn find_by_ip(&self, ip: &str) -> Result<Option<DeviceRecord>, StorageError>;

    /// 列出指定用户认领的设备
    async fn list_owned_by(&self, user_id: &str) -> Result<Vec<DeviceRecord>, StorageError>;

    /// 列出未认领设备
    async fn list_unclaimed(&self) -> Result<Vec<DeviceRecord>, StorageError>;

    /// 插入新记录；MAC 已存在时报错（MAC 唯一性由存储层兜底）
    async fn insert(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError>;

    /// 手动更新；设备不存在返回 None
    async fn update(
        &self,
        device_id: &str,
        update: DeviceUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError>;

    /// 删除设备；存在并删除返回 true
    async fn delete(&self, device_id: &str) -> Result<bool, StorageError>;

    /// 按 MAC 刷新心跳字段（IP 总是写入，名称/固件仅在携带时覆盖）；
    /// MAC 未注册返回 None
    async fn register_heartbeat(
        &self,
        mac: &Mac,
        update: RegistrationUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError>;

    /// 给按 IP 找到且尚无 MAC 的记录挂接 MAC；无匹配记录返回 None
    async fn attach_mac(
        &self,
        ip: &str,
        mac: &Mac,
        update: RegistrationUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError>;

    /// 认领：单条条件更新（归属为空或已是本人时写入），原子分出唯一赢家
    async fn claim_owner(&self, device_id: &str, user_id: &str)
    -> Result<ClaimOutcome, StorageError>;

    /// 按 MAC 认领，语义同 [`DeviceStore::claim_owner`]
    async fn claim_owner_by_mac(
        &self,
        mac: &Mac,
        user_id: &str,
    ) -> Result<ClaimOutcome, StorageError>;

    /// 释放：仅当前归属用户可清空归属
    async fn release_owner(
        &self,
        device_id: &str,
        user_id: &str,
    ) -> Result<ReleaseOutcome, StorageError>;

    /// 合并一次遥测上报：仅覆盖上报携带的字段，按 index upsert 通道状态；
    /// MAC 未注册返回 None 且不得创建记录
    async fn merge_report(
        &self,
        mac: &Mac,
        update: TelemetryUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError>;

    /// 指令下发后的乐观状态写入（门/舵机类）；记录不存在时静默跳过
    async fn set_latch_status(
        &self,
        device_id: &str,
        status: PowerState,
    ) -> Result<(), StorageError>;

    /// 指令下发后的通道乐观状态写入；通道不存在时按默认名补建
    async fn set_channel_state(
        &self,
        device_id: &str,
        channel: i32,
        state: PowerState,
    ) -> Result<(), StorageError>;
}
