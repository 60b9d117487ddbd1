//! # PostgreSQL 存储实现模块
//!
//! 生产环境使用的设备状态持久化网关。
//!
//! ## 数据库模式要求
//!
//! - `devices`：设备表，本模块读写以下列
//!   - `device_id`, `tenant_id`, `project_id`
//!   - `last_access_ms`（bigint，最近一次报文的观测时间，epoch 毫秒）
//!   - `connection_status`（smallint，0 = 离线，1 = 在线）
//!   - `deleted_at`（timestamptz，非空表示记录已失效）
//!
//! ## 事务
//!
//! `write_status` 在单个事务内先 `for update` 锁定行并检查失效标记，
//! 再同时更新两个字段后提交，保证两个字段总是一起可见。
//!
//! ## 错误处理
//!
//! 所有存储操作返回 `Result<T, StorageError>`，`sqlx::Error` 自动转换。

pub mod device;

pub use device::*;
