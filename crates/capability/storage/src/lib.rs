//! # EMS Storage 模块
//!
//! 设备连接状态的持久化网关（Durable Store Gateway）。在线检测核心只依赖
//! [`DeviceStatusStore`]，具体后端可替换。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：设备枚举、单设备读取、状态原子写回
//! 2. **数据模型层** (`models.rs`)：`DeviceStatusRecord` / `DeviceStatusUpdate`
//! 3. **错误处理层** (`error.rs`)：统一的 `StorageError`（带错误分类）
//! 4. **验证辅助层** (`validation.rs`)：租户和项目作用域验证
//! 5. **连接管理层** (`connection.rs`)：Postgres 连接池
//! 6. **实现层**：
//!    - `in_memory/`：内存实现（测试与演示）
//!    - `postgres/`：PostgreSQL 实现（生产环境）
//!
//! ## 写回语义
//!
//! - `last_access_ms` 与 `connection_status` 总是在一次事务内一起写入
//! - 记录缺失返回 `StorageErrorKind::NotFound`
//! - 记录已失效（并发拆除）返回 `StorageErrorKind::Invalidated`
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use ems_storage::{DeviceStatusStore, InMemoryDeviceStatusStore};
//! use domain::TenantContext;
//!
//! let store = InMemoryDeviceStatusStore::new();
//! let ctx = TenantContext::system("tenant-1", "project-1");
//! let devices = store.list_devices(&ctx, "project-1").await?;
//! ```

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod traits;
pub mod validation;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use traits::*;
pub use validation::*;

pub use in_memory::InMemoryDeviceStatusStore;
pub use postgres::PgDeviceStatusStore;
