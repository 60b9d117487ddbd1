//! 数据库连接管理
//!
//! - connect_pool：建立 Postgres 连接池（最大连接数 8）
//!
//! 写回很短，且只在状态翻转时发生，小连接池即可。

use crate::error::StorageError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// 建立 Postgres 连接池
///
/// 获取连接最多等待 5 秒，数据库不可用时检测轮次会降级为"本轮不持久化"。
pub async fn connect_pool(database_url: &str) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;
    Ok(pool)
}
