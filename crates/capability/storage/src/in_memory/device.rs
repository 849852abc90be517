//! 设备注册表内存存储实现
//!
//! 用于测试和无数据库的单机演示。
//!
//! 并发模型：
//! - DashMap 按 key 分片，单条记录的可变引用互斥，天然满足
//!   "按记录串行、跨记录并行"
//! - `mac_index` 维护规范 MAC → device_id 的反查；MAC 槽位先于
//!   记录写入占用，保证 MAC 唯一
//! - 任何方法不得跨两个 map 同时持有 guard

use crate::error::StorageError;
use crate::models::{ClaimOutcome, DeviceUpdate, RegistrationUpdate, ReleaseOutcome};
use crate::traits::DeviceStore;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use domain::{Channel, DeviceRecord, Mac, PowerState, TelemetryUpdate, now_epoch_ms};

/// 设备注册表内存存储
pub struct InMemoryDeviceStore {
    devices: DashMap<String, DeviceRecord>,
    /// 规范 MAC（冒号形式）→ device_id
    mac_index: DashMap<String, String>,
}

impl InMemoryDeviceStore {
    /// 创建空的注册表存储
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
            mac_index: DashMap::new(),
        }
    }

    fn resolve_mac(&self, mac: &Mac) -> Option<String> {
        self.mac_index.get(mac.as_str()).map(|id| id.value().clone())
    }
}

impl Default for InMemoryDeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_registration(record: &mut DeviceRecord, update: RegistrationUpdate) {
    record.ip = Some(update.ip);
    if let Some(name) = update.name {
        record.name = name;
    }
    if let Some(firmware) = update.firmware_version {
        record.firmware_version = Some(firmware);
    }
    record.updated_at_ms = now_epoch_ms();
}

fn upsert_channel_state(record: &mut DeviceRecord, index: i32, state: PowerState) {
    match record.channels.iter_mut().find(|c| c.index == index) {
        Some(channel) => channel.state = state,
        None => {
            let room = record.room.clone();
            record.channels.push(Channel {
                index,
                name: format!("Channel {index}"),
                room,
                state,
            });
            record.channels.sort_by_key(|c| c.index);
        }
    }
}

#[async_trait::async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn find_by_id(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError> {
        Ok(self.devices.get(device_id).map(|item| item.value().clone()))
    }

    async fn find_by_mac(&self, mac: &Mac) -> Result<Option<DeviceRecord>, StorageError> {
        let Some(device_id) = self.resolve_mac(mac) else {
            return Ok(None);
        };
        Ok(self.devices.get(&device_id).map(|item| item.value().clone()))
    }

    async fn find_by_ip(&self, ip: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let item = self
            .devices
            .iter()
            .find(|item| item.ip.as_deref() == Some(ip))
            .map(|item| item.value().clone());
        Ok(item)
    }

    async fn list_owned_by(&self, user_id: &str) -> Result<Vec<DeviceRecord>, StorageError> {
        let mut items: Vec<DeviceRecord> = self
            .devices
            .iter()
            .filter(|item| item.owned_by(user_id))
            .map(|item| item.value().clone())
            .collect();
        items.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
        Ok(items)
    }

    async fn list_unclaimed(&self) -> Result<Vec<DeviceRecord>, StorageError> {
        let mut items: Vec<DeviceRecord> = self
            .devices
            .iter()
            .filter(|item| !item.is_claimed())
            .map(|item| item.value().clone())
            .collect();
        items.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
        Ok(items)
    }

    async fn insert(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError> {
        if self.devices.contains_key(&record.device_id) {
            return Err(StorageError::new("device exists"));
        }
        // 先占 MAC 槽位再写记录，占不到即重复注册
        if let Some(mac) = &record.mac {
            let reserved = match self.mac_index.entry(mac.as_str().to_string()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(record.device_id.clone());
                    true
                }
            };
            if !reserved {
                return Err(StorageError::new("mac already registered"));
            }
        }
        self.devices.insert(record.device_id.clone(), record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        device_id: &str,
        update: DeviceUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let Some(mut record) = self.devices.get_mut(device_id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(kind) = update.kind {
            record.kind = kind;
        }
        if let Some(room) = update.room {
            record.room = room;
        }
        if let Some(ip) = update.ip {
            record.ip = Some(ip);
        }
        if let Some(channels) = update.channels {
            record.channels = channels;
            record.channels.sort_by_key(|c| c.index);
        }
        if let Some(firmware) = update.firmware_version {
            record.firmware_version = Some(firmware);
        }
        if let Some(password) = update.settings_password {
            record.settings_password = Some(password);
        }
        record.updated_at_ms = now_epoch_ms();
        Ok(Some(record.clone()))
    }

    async fn delete(&self, device_id: &str) -> Result<bool, StorageError> {
        let Some((_, record)) = self.devices.remove(device_id) else {
            return Ok(false);
        };
        if let Some(mac) = record.mac {
            self.mac_index.remove(mac.as_str());
        }
        Ok(true)
    }

    async fn register_heartbeat(
        &self,
        mac: &Mac,
        update: RegistrationUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let Some(device_id) = self.resolve_mac(mac) else {
            return Ok(None);
        };
        let Some(mut record) = self.devices.get_mut(&device_id) else {
            return Ok(None);
        };
        apply_registration(&mut record, update);
        Ok(Some(record.clone()))
    }

    async fn attach_mac(
        &self,
        ip: &str,
        mac: &Mac,
        update: RegistrationUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let candidate = self
            .devices
            .iter()
            .find(|item| item.mac.is_none() && item.ip.as_deref() == Some(ip))
            .map(|item| item.device_id.clone());
        let Some(device_id) = candidate else {
            return Ok(None);
        };

        let reserved = match self.mac_index.entry(mac.as_str().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(device_id.clone());
                true
            }
        };
        if !reserved {
            return Err(StorageError::new("mac already registered"));
        }

        let Some(mut record) = self.devices.get_mut(&device_id) else {
            self.mac_index.remove(mac.as_str());
            return Ok(None);
        };
        if record.mac.is_some() {
            // 并发注册抢先挂接了别的 MAC
            drop(record);
            self.mac_index.remove(mac.as_str());
            return Ok(None);
        }
        record.mac = Some(mac.clone());
        apply_registration(&mut record, update);
        Ok(Some(record.clone()))
    }

    async fn claim_owner(
        &self,
        device_id: &str,
        user_id: &str,
    ) -> Result<ClaimOutcome, StorageError> {
        let Some(mut record) = self.devices.get_mut(device_id) else {
            return Ok(ClaimOutcome::NotFound);
        };
        match record.owner_id.as_deref() {
            Some(current) if current != user_id => Ok(ClaimOutcome::AlreadyOwned),
            _ => {
                record.owner_id = Some(user_id.to_string());
                record.updated_at_ms = now_epoch_ms();
                Ok(ClaimOutcome::Claimed(record.clone()))
            }
        }
    }

    async fn claim_owner_by_mac(
        &self,
        mac: &Mac,
        user_id: &str,
    ) -> Result<ClaimOutcome, StorageError> {
        let Some(device_id) = self.resolve_mac(mac) else {
            return Ok(ClaimOutcome::NotFound);
        };
        self.claim_owner(&device_id, user_id).await
    }

    async fn release_owner(
        &self,
        device_id: &str,
        user_id: &str,
    ) -> Result<ReleaseOutcome, StorageError> {
        let Some(mut record) = self.devices.get_mut(device_id) else {
            return Ok(ReleaseOutcome::NotFound);
        };
        if !record.owned_by(user_id) {
            return Ok(ReleaseOutcome::NotOwner);
        }
        record.owner_id = None;
        record.updated_at_ms = now_epoch_ms();
        Ok(ReleaseOutcome::Released)
    }

    async fn merge_report(
        &self,
        mac: &Mac,
        update: TelemetryUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let Some(device_id) = self.resolve_mac(mac) else {
            return Ok(None);
        };
        let Some(mut record) = self.devices.get_mut(&device_id) else {
            return Ok(None);
        };
        record.telemetry.apply(&update);
        if let Some(door) = update.door {
            record.status = door;
        }
        for (index, state) in &update.channel_states {
            upsert_channel_state(&mut record, *index, *state);
        }
        record.updated_at_ms = now_epoch_ms();
        Ok(Some(record.clone()))
    }

    async fn set_latch_status(
        &self,
        device_id: &str,
        status: PowerState,
    ) -> Result<(), StorageError> {
        if let Some(mut record) = self.devices.get_mut(device_id) {
            record.status = status;
            record.updated_at_ms = now_epoch_ms();
        }
        Ok(())
    }

    async fn set_channel_state(
        &self,
        device_id: &str,
        channel: i32,
        state: PowerState,
    ) -> Result<(), StorageError> {
        if let Some(mut record) = self.devices.get_mut(device_id) {
            upsert_channel_state(&mut record, channel, state);
            record.updated_at_ms = now_epoch_ms();
        }
        Ok(())
    }
}
