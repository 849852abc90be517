use crate::ProvisionError;
use casa_storage::{DeviceStore, RegistrationUpdate, StorageError};
use casa_telemetry::{record_device_linked, record_device_registered, record_heartbeat};
use domain::{
    DEFAULT_ROOM, DeviceKind, DeviceRecord, Mac, PowerState, TelemetryState, now_epoch_ms,
};
use std::sync::Arc;
use tracing::info;

/// 设备自注册请求（固件开机心跳携带的字段）。
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub mac: Mac,
    pub ip: String,
    pub name: Option<String>,
    pub firmware_version: Option<String>,
}

/// 注册处理方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    /// MAC 已注册，刷新心跳字段
    Updated,
    /// 按 IP 命中无 MAC 的手工记录，挂接 MAC
    Linked,
    /// 新建未认领记录
    Registered,
}

impl RegistrationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationKind::Updated => "updated",
            RegistrationKind::Linked => "linked",
            RegistrationKind::Registered => "registered",
        }
    }
}

/// 注册结果。
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub kind: RegistrationKind,
    pub record: DeviceRecord,
}

/// 设备自注册服务。
///
/// 三分支：MAC 命中刷新心跳；IP 命中挂接 MAC；否则新建。
/// 新建记录一律未认领，归属只经认领流程写入。
pub struct Registrar {
    store: Arc<dyn DeviceStore>,
}

impl Registrar {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    pub async fn register_or_update(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationOutcome, ProvisionError> {
        let RegistrationRequest {
            mac,
            ip,
            name,
            firmware_version,
        } = request;
        let update = RegistrationUpdate {
            ip: ip.clone(),
            name: name.clone(),
            firmware_version: firmware_version.clone(),
        };

        // MAC 即身份：已注册设备只刷新心跳字段
        if let Some(record) = self
            .store
            .register_heartbeat(&mac, update.clone())
            .await
            .map_err(storage_error)?
        {
            record_heartbeat();
            info!(target: "casa.provision", mac = %mac, ip = %ip, "device_heartbeat");
            return Ok(RegistrationOutcome {
                kind: RegistrationKind::Updated,
                record,
            });
        }

        // 手工录入的记录只有 IP：设备首个心跳给它挂上 MAC
        if let Some(record) = self
            .store
            .attach_mac(&ip, &mac, update.clone())
            .await
            .map_err(storage_error)?
        {
            record_device_linked();
            info!(
                target: "casa.provision",
                mac = %mac,
                ip = %ip,
                device_id = %record.device_id,
                "device_linked"
            );
            return Ok(RegistrationOutcome {
                kind: RegistrationKind::Linked,
                record,
            });
        }

        let now = now_epoch_ms();
        let record = DeviceRecord {
            device_id: uuid::Uuid::new_v4().to_string(),
            mac: Some(mac.clone()),
            ip: Some(ip.clone()),
            name: name.unwrap_or_else(|| casa_protocol::default_device_name(&mac)),
            kind: DeviceKind::Other,
            room: DEFAULT_ROOM.to_string(),
            owner_id: None,
            status: PowerState::Off,
            channels: Vec::new(),
            telemetry: TelemetryState::default(),
            firmware_version,
            settings_password: None,
            created_at_ms: now,
            updated_at_ms: now,
        };
        let record = match self.store.insert(record).await {
            Ok(record) => record,
            Err(err) => {
                // 同一 MAC 并发注册时 MAC 唯一性兜底：重走一次心跳路径
                if let Some(record) = self
                    .store
                    .register_heartbeat(&mac, update)
                    .await
                    .map_err(storage_error)?
                {
                    record_heartbeat();
                    return Ok(RegistrationOutcome {
                        kind: RegistrationKind::Updated,
                        record,
                    });
                }
                return Err(storage_error(err));
            }
        };
        record_device_registered();
        info!(
            target: "casa.provision",
            mac = %mac,
            ip = %ip,
            device_id = %record.device_id,
            "device_registered"
        );
        Ok(RegistrationOutcome {
            kind: RegistrationKind::Registered,
            record,
        })
    }
}

fn storage_error(err: StorageError) -> ProvisionError {
    ProvisionError::Storage(err.to_string())
}
