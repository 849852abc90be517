//! Postgres 设备注册表实现
//!
//! 设计要点：
//! - 认领/释放/挂接 MAC 为单条条件 UPDATE，原子性由数据库行锁保证
//! - 手动更新与遥测合并用 COALESCE 只覆盖携带的字段
//! - 通道保存在 device_channels 表，按 (device_id, channel_index) upsert

use crate::error::StorageError;
use crate::models::{ClaimOutcome, DeviceUpdate, RegistrationUpdate, ReleaseOutcome};
use crate::traits::DeviceStore;
use domain::{
    Channel, DeviceKind, DeviceRecord, Mac, PowerState, RainState, TelemetryState,
    TelemetryUpdate, now_epoch_ms,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;

/// devices 表的完整列清单，所有查询与 RETURNING 共用。
const DEVICE_COLUMNS: &str = "device_id, mac, ip, name, kind, room, owner_id, status, \
     temperature_c, humidity_pct, gas_level, rain, light_level, auto_light, auto_mode, \
     screen_mode, last_update_ms, firmware_version, settings_password, created_at_ms, \
     updated_at_ms";

/// 通道 upsert：不存在则按默认名补建（房间继承设备），存在则仅改状态。
const CHANNEL_UPSERT: &str = "insert into device_channels \
     (device_id, channel_index, name, room, state) \
     select d.device_id, $2, 'Channel ' || $2::text, d.room, $3 \
     from devices d where d.device_id = $1 \
     on conflict (device_id, channel_index) do update set state = excluded.state";

pub struct PgDeviceStore {
    pub pool: PgPool,
}

impl PgDeviceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }

    async fn load_channels(&self, record: &mut DeviceRecord) -> Result<(), StorageError> {
        let rows = sqlx::query(
            "select channel_index, name, room, state from device_channels \
             where device_id = $1 order by channel_index",
        )
        .bind(&record.device_id)
        .fetch_all(&self.pool)
        .await?;
        record.channels = rows
            .iter()
            .map(channel_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(())
    }

    async fn load_channels_many(
        &self,
        records: &mut [DeviceRecord],
    ) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = records.iter().map(|r| r.device_id.clone()).collect();
        let rows = sqlx::query(
            "select device_id, channel_index, name, room, state from device_channels \
             where device_id = any($1) order by channel_index",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_device: HashMap<String, Vec<Channel>> = HashMap::new();
        for row in &rows {
            let device_id: String = row.try_get("device_id")?;
            by_device
                .entry(device_id)
                .or_default()
                .push(channel_from_row(row)?);
        }
        for record in records.iter_mut() {
            if let Some(channels) = by_device.remove(&record.device_id) {
                record.channels = channels;
            }
        }
        Ok(())
    }

    async fn replace_channels(
        &self,
        device_id: &str,
        channels: &[Channel],
    ) -> Result<(), StorageError> {
        sqlx::query("delete from device_channels where device_id = $1")
            .bind(device_id)
            .execute(&self.pool)
            .await?;
        for channel in channels {
            sqlx::query(
                "insert into device_channels (device_id, channel_index, name, room, state) \
                 values ($1, $2, $3, $4, $5)",
            )
            .bind(device_id)
            .bind(channel.index)
            .bind(&channel.name)
            .bind(&channel.room)
            .bind(channel.state.as_str())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn exists(&self, device_id: &str) -> Result<bool, StorageError> {
        let row = sqlx::query("select 1 as one from devices where device_id = $1")
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

fn channel_from_row(row: &PgRow) -> Result<Channel, StorageError> {
    let state: String = row.try_get("state")?;
    Ok(Channel {
        index: row.try_get("channel_index")?,
        name: row.try_get("name")?,
        room: row.try_get("room")?,
        state: PowerState::from_wire(&state),
    })
}

fn record_from_row(row: &PgRow) -> Result<DeviceRecord, StorageError> {
    let mac: Option<String> = row.try_get("mac")?;
    let mac = mac
        .map(|value| Mac::parse(&value))
        .transpose()
        .map_err(|err| StorageError::new(err.to_string()))?;
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    let rain: Option<String> = row.try_get("rain")?;

    Ok(DeviceRecord {
        device_id: row.try_get("device_id")?,
        mac,
        ip: row.try_get("ip")?,
        name: row.try_get("name")?,
        kind: DeviceKind::parse(&kind),
        room: row.try_get("room")?,
        owner_id: row.try_get("owner_id")?,
        status: PowerState::from_wire(&status),
        channels: Vec::new(),
        telemetry: TelemetryState {
            temperature_c: row.try_get("temperature_c")?,
            humidity_pct: row.try_get("humidity_pct")?,
            gas_level: row.try_get("gas_level")?,
            rain: rain.as_deref().and_then(RainState::parse),
            light_level: row.try_get("light_level")?,
            auto_light: row.try_get("auto_light")?,
            auto_mode: row.try_get("auto_mode")?,
            screen_mode: row.try_get("screen_mode")?,
            last_update_ms: row.try_get("last_update_ms")?,
        },
        firmware_version: row.try_get("firmware_version")?,
        settings_password: row.try_get("settings_password")?,
        created_at_ms: row.try_get("created_at_ms")?,
        updated_at_ms: row.try_get("updated_at_ms")?,
    })
}

#[async_trait::async_trait]
impl DeviceStore for PgDeviceStore {
    async fn find_by_id(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let sql = format!("select {DEVICE_COLUMNS} from devices where device_id = $1");
        let row = sqlx::query(&sql)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = record_from_row(&row)?;
        self.load_channels(&mut record).await?;
        Ok(Some(record))
    }

    async fn find_by_mac(&self, mac: &Mac) -> Result<Option<DeviceRecord>, StorageError> {
        let sql = format!("select {DEVICE_COLUMNS} from devices where mac = $1");
        let row = sqlx::query(&sql)
            .bind(mac.as_str())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = record_from_row(&row)?;
        self.load_channels(&mut record).await?;
        Ok(Some(record))
    }

    async fn find_by_ip(&self, ip: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let sql = format!(
            "select {DEVICE_COLUMNS} from devices where ip = $1 order by created_at_ms limit 1"
        );
        let row = sqlx::query(&sql)
            .bind(ip)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = record_from_row(&row)?;
        self.load_channels(&mut record).await?;
        Ok(Some(record))
    }

    async fn list_owned_by(&self, user_id: &str) -> Result<Vec<DeviceRecord>, StorageError> {
        let sql = format!(
            "select {DEVICE_COLUMNS} from devices where owner_id = $1 order by created_at_ms"
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;
        let mut records = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.load_channels_many(&mut records).await?;
        Ok(records)
    }

    async fn list_unclaimed(&self) -> Result<Vec<DeviceRecord>, StorageError> {
        let sql = format!(
            "select {DEVICE_COLUMNS} from devices where owner_id is null order by created_at_ms"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut records = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        self.load_channels_many(&mut records).await?;
        Ok(records)
    }

    async fn insert(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError> {
        sqlx::query(
            "insert into devices (device_id, mac, ip, name, kind, room, owner_id, status, \
             temperature_c, humidity_pct, gas_level, rain, light_level, auto_light, auto_mode, \
             screen_mode, last_update_ms, firmware_version, settings_password, created_at_ms, \
             updated_at_ms) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21)",
        )
        .bind(&record.device_id)
        .bind(record.mac.as_ref().map(|m| m.as_str()))
        .bind(&record.ip)
        .bind(&record.name)
        .bind(record.kind.as_str())
        .bind(&record.room)
        .bind(&record.owner_id)
        .bind(record.status.as_str())
        .bind(record.telemetry.temperature_c)
        .bind(record.telemetry.humidity_pct)
        .bind(record.telemetry.gas_level)
        .bind(record.telemetry.rain.map(|r| r.as_str()))
        .bind(record.telemetry.light_level)
        .bind(record.telemetry.auto_light)
        .bind(record.telemetry.auto_mode)
        .bind(record.telemetry.screen_mode)
        .bind(record.telemetry.last_update_ms)
        .bind(&record.firmware_version)
        .bind(&record.settings_password)
        .bind(record.created_at_ms)
        .bind(record.updated_at_ms)
        .execute(&self.pool)
        .await?;

        self.replace_channels(&record.device_id, &record.channels)
            .await?;
        Ok(record)
    }

    async fn update(
        &self,
        device_id: &str,
        update: DeviceUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let DeviceUpdate {
            name,
            kind,
            room,
            ip,
            channels,
            firmware_version,
            settings_password,
        } = update;

        let sql = format!(
            "update devices set \
             name = coalesce($1, name), \
             kind = coalesce($2, kind), \
             room = coalesce($3, room), \
             ip = coalesce($4, ip), \
             firmware_version = coalesce($5, firmware_version), \
             settings_password = coalesce($6, settings_password), \
             updated_at_ms = $7 \
             where device_id = $8 \
             returning {DEVICE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(name)
            .bind(kind.map(|k| k.as_str()))
            .bind(room)
            .bind(ip)
            .bind(firmware_version)
            .bind(settings_password)
            .bind(now_epoch_ms())
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = record_from_row(&row)?;

        if let Some(mut channels) = channels {
            channels.sort_by_key(|c| c.index);
            self.replace_channels(device_id, &channels).await?;
            record.channels = channels;
        } else {
            self.load_channels(&mut record).await?;
        }
        Ok(Some(record))
    }

    async fn delete(&self, device_id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("delete from devices where device_id = $1")
            .bind(device_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn register_heartbeat(
        &self,
        mac: &Mac,
        update: RegistrationUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let sql = format!(
            "update devices set \
             ip = $2, \
             name = coalesce($3, name), \
             firmware_version = coalesce($4, firmware_version), \
             updated_at_ms = $5 \
             where mac = $1 \
             returning {DEVICE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(mac.as_str())
            .bind(&update.ip)
            .bind(update.name)
            .bind(update.firmware_version)
            .bind(now_epoch_ms())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = record_from_row(&row)?;
        self.load_channels(&mut record).await?;
        Ok(Some(record))
    }

    async fn attach_mac(
        &self,
        ip: &str,
        mac: &Mac,
        update: RegistrationUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let sql = format!(
            "update devices set \
             mac = $2, \
             ip = $3, \
             name = coalesce($4, name), \
             firmware_version = coalesce($5, firmware_version), \
             updated_at_ms = $6 \
             where device_id = (select device_id from devices \
                 where ip = $1 and mac is null order by created_at_ms limit 1) \
             returning {DEVICE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(ip)
            .bind(mac.as_str())
            .bind(&update.ip)
            .bind(update.name)
            .bind(update.firmware_version)
            .bind(now_epoch_ms())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = record_from_row(&row)?;
        self.load_channels(&mut record).await?;
        Ok(Some(record))
    }

    async fn claim_owner(
        &self,
        device_id: &str,
        user_id: &str,
    ) -> Result<ClaimOutcome, StorageError> {
        let sql = format!(
            "update devices set owner_id = $2, updated_at_ms = $3 \
             where device_id = $1 and (owner_id is null or owner_id = $2) \
             returning {DEVICE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(device_id)
            .bind(user_id)
            .bind(now_epoch_ms())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let mut record = record_from_row(&row)?;
                self.load_channels(&mut record).await?;
                Ok(ClaimOutcome::Claimed(record))
            }
            None if self.exists(device_id).await? => Ok(ClaimOutcome::AlreadyOwned),
            None => Ok(ClaimOutcome::NotFound),
        }
    }

    async fn claim_owner_by_mac(
        &self,
        mac: &Mac,
        user_id: &str,
    ) -> Result<ClaimOutcome, StorageError> {
        let sql = format!(
            "update devices set owner_id = $2, updated_at_ms = $3 \
             where mac = $1 and (owner_id is null or owner_id = $2) \
             returning {DEVICE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(mac.as_str())
            .bind(user_id)
            .bind(now_epoch_ms())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let mut record = record_from_row(&row)?;
                self.load_channels(&mut record).await?;
                Ok(ClaimOutcome::Claimed(record))
            }
            None => {
                let found = sqlx::query("select 1 as one from devices where mac = $1")
                    .bind(mac.as_str())
                    .fetch_optional(&self.pool)
                    .await?;
                if found.is_some() {
                    Ok(ClaimOutcome::AlreadyOwned)
                } else {
                    Ok(ClaimOutcome::NotFound)
                }
            }
        }
    }

    async fn release_owner(
        &self,
        device_id: &str,
        user_id: &str,
    ) -> Result<ReleaseOutcome, StorageError> {
        let result = sqlx::query(
            "update devices set owner_id = null, updated_at_ms = $3 \
             where device_id = $1 and owner_id = $2",
        )
        .bind(device_id)
        .bind(user_id)
        .bind(now_epoch_ms())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(ReleaseOutcome::Released);
        }
        if self.exists(device_id).await? {
            Ok(ReleaseOutcome::NotOwner)
        } else {
            Ok(ReleaseOutcome::NotFound)
        }
    }

    async fn merge_report(
        &self,
        mac: &Mac,
        update: TelemetryUpdate,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let sql = format!(
            "update devices set \
             temperature_c = coalesce($2, temperature_c), \
             humidity_pct = coalesce($3, humidity_pct), \
             gas_level = coalesce($4, gas_level), \
             rain = coalesce($5, rain), \
             light_level = coalesce($6, light_level), \
             auto_light = coalesce($7, auto_light), \
             auto_mode = coalesce($8, auto_mode), \
             screen_mode = coalesce($9, screen_mode), \
             status = coalesce($10, status), \
             last_update_ms = $11, \
             updated_at_ms = $12 \
             where mac = $1 \
             returning {DEVICE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(mac.as_str())
            .bind(update.temperature_c)
            .bind(update.humidity_pct)
            .bind(update.gas_level)
            .bind(update.rain.map(|r| r.as_str()))
            .bind(update.light_level)
            .bind(update.auto_light)
            .bind(update.auto_mode)
            .bind(update.screen_mode)
            .bind(update.door.map(|d| d.as_str()))
            .bind(update.reported_at_ms)
            .bind(now_epoch_ms())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = record_from_row(&row)?;

        for (index, state) in &update.channel_states {
            sqlx::query(CHANNEL_UPSERT)
                .bind(&record.device_id)
                .bind(index)
                .bind(state.as_str())
                .execute(&self.pool)
                .await?;
        }
        self.load_channels(&mut record).await?;
        Ok(Some(record))
    }

    async fn set_latch_status(
        &self,
        device_id: &str,
        status: PowerState,
    ) -> Result<(), StorageError> {
        sqlx::query("update devices set status = $2, updated_at_ms = $3 where device_id = $1")
            .bind(device_id)
            .bind(status.as_str())
            .bind(now_epoch_ms())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_channel_state(
        &self,
        device_id: &str,
        channel: i32,
        state: PowerState,
    ) -> Result<(), StorageError> {
        sqlx::query(CHANNEL_UPSERT)
            .bind(device_id)
            .bind(channel)
            .bind(state.as_str())
            .execute(&self.pool)
            .await?;
        sqlx::query("update devices set updated_at_ms = $2 where device_id = $1")
            .bind(device_id)
            .bind(now_epoch_ms())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
