use ems_storage::StorageError;

/// 在线检测服务错误。
#[derive(Debug, thiserror::Error)]
pub enum LivenessError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("liveness worker closed")]
    Closed,
}
