//! 内存存储实现模块
//!
//! 用于测试与无数据库的演示模式。
//!
//! 包含以下实现：
//! - DeviceStatusStore: InMemoryDeviceStatusStore

pub mod device;

pub use device::*;
