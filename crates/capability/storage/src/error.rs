//! 存储层错误类型
//!
//! 定义统一的存储错误类型，用于封装底层错误：
//! - SQL 执行与连接错误
//! - 作用域校验失败
//! - 写回时记录缺失或已失效（并发删除）

/// 错误分类，供上层决定是否可以在下一轮自愈。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    Backend,
    Scope,
    NotFound,
    Invalidated,
}

#[derive(Debug)]
pub struct StorageError {
    kind: StorageErrorKind,
    message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: StorageErrorKind::Backend,
            message: message.into(),
        }
    }

    pub fn scope(message: impl Into<String>) -> Self {
        Self {
            kind: StorageErrorKind::Scope,
            message: message.into(),
        }
    }

    pub fn not_found(device_id: &str) -> Self {
        Self {
            kind: StorageErrorKind::NotFound,
            message: format!("device not found: {}", device_id),
        }
    }

    pub fn invalidated(device_id: &str) -> Self {
        Self {
            kind: StorageErrorKind::Invalidated,
            message: format!("device invalidated: {}", device_id),
        }
    }

    pub fn kind(&self) -> StorageErrorKind {
        self.kind
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::new(err.to_string())
    }
}
