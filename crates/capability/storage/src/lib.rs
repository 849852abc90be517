//! # 设备注册表存储模块
//!
//! 本模块提供设备注册表的统一存储抽象，支持多种存储后端实现。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：`DeviceStore` 异步 Trait 接口
//! 2. **数据模型层** (`models.rs`)：更新输入与认领/释放结果类型
//! 3. **错误处理层** (`error.rs`)：统一的存储错误类型
//! 4. **连接管理层** (`connection.rs`)：数据库连接池管理
//! 5. **实现层**：
//!    - `in_memory/`：内存存储实现（测试与单机演示）
//!    - `postgres/`：PostgreSQL 存储实现（生产环境使用）
//!
//! ## 核心约定
//!
//! - **MAC 即身份**：`mac` 列唯一；所有按 MAC 的查询都接收已规范化的
//!   [`domain::Mac`]，调用方无法绕过规范化（身份相等性依赖于此）
//! - **IP 不是键**：DHCP 续租会更换 IP，IP 仅用于注册时的合并查找与
//!   HTTP 直连路由，绝不作为长期标识
//! - **单记录串行**：认领/释放是单条条件更新（CAS），遥测合并在同一
//!   记录上互斥执行；跨记录操作互不阻塞，没有全局大锁
//! - **变更打点**：每次成功变更刷新 `updated_at_ms`，遥测合并另行
//!   刷新 `last_update_ms`
//!
//! ## 存储实现
//!
//! - [`in_memory`]：DashMap 分片映射 + MAC 反查索引，
//!   单条目独占引用天然满足按记录串行
//! - [`postgres`]：sqlx 参数化查询；认领/释放/挂接 MAC 均为
//!   单条条件 `UPDATE`，通道表按 `(device_id, channel_index)` upsert

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod traits;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use traits::*;

pub use in_memory::InMemoryDeviceStore;
pub use postgres::PgDeviceStore;
