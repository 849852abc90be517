//! # PostgreSQL 存储实现模块
//!
//! 本模块提供 `DeviceStore` 的 PostgreSQL 实现，用于生产环境。
//!
//! ## 设计原则
//!
//! 1. **参数化查询**：所有 SQL 查询使用参数绑定，防止 SQL 注入攻击
//! 2. **条件更新即并发控制**：认领/释放/挂接 MAC 均为单条带条件的
//!    `UPDATE`，由数据库行锁保证原子性，应用层没有读-改-写窗口
//! 3. **COALESCE 合并**：手动更新与遥测合并只覆盖携带的字段
//! 4. **连接池管理**：使用连接池复用数据库连接（最大 8 连接）
//!
//! ## 数据库模式要求
//!
//! ### devices 表
//!
//! ```sql
//! create table devices (
//!   device_id         text primary key,
//!   mac               text unique,
//!   ip                text,
//!   name              text not null,
//!   kind              text not null default 'other',
//!   room              text not null default 'Living Room',
//!   owner_id          text,
//!   status            text not null default 'off',
//!   temperature_c     double precision,
//!   humidity_pct      double precision,
//!   gas_level         bigint,
//!   rain              text,
//!   light_level       bigint,
//!   auto_light        boolean,
//!   auto_mode         boolean,
//!   screen_mode       bigint,
//!   last_update_ms    bigint,
//!   firmware_version  text,
//!   settings_password text,
//!   created_at_ms     bigint not null,
//!   updated_at_ms     bigint not null
//! );
//! create index idx_devices_owner on devices (owner_id);
//! create index idx_devices_ip on devices (ip);
//! ```
//!
//! ### device_channels 表
//!
//! ```sql
//! create table device_channels (
//!   device_id     text not null references devices (device_id) on delete cascade,
//!   channel_index integer not null,
//!   name          text not null,
//!   room          text not null,
//!   state         text not null default 'off',
//!   primary key (device_id, channel_index)
//! );
//! ```
//!
//! `mac` 列上的唯一约束是 MAC 唯一性的最终防线；`owner_id` 为 null
//! 表示未认领。遥测字段全部可空：null 表示设备从未上报过该项。

pub mod device;

pub use device::*;
