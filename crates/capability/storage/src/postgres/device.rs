//! Postgres 设备状态存储实现
//!
//! 设计要点：
//! - 所有操作都带有租户和项目作用域验证
//! - 使用参数化 SQL 防止注入
//! - 状态写回在事务内完成

use crate::error::StorageError;
use crate::models::{DeviceStatusRecord, DeviceStatusUpdate};
use crate::traits::DeviceStatusStore;
use crate::validation::ensure_project_scope;
use domain::{ConnectionStatus, TenantContext};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

pub struct PgDeviceStatusStore {
    pub pool: PgPool,
}

impl PgDeviceStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self::new(pool))
    }
}

fn record_from_row(row: &PgRow) -> Result<DeviceStatusRecord, StorageError> {
    let status: i16 = row.try_get("connection_status")?;
    Ok(DeviceStatusRecord {
        tenant_id: row.try_get("tenant_id")?,
        project_id: row.try_get("project_id")?,
        device_id: row.try_get("device_id")?,
        last_access_ms: row.try_get("last_access_ms")?,
        connection_status: ConnectionStatus::from_i16(status),
        invalidated: row.try_get("invalidated")?,
    })
}

#[async_trait::async_trait]
impl DeviceStatusStore for PgDeviceStatusStore {
    async fn list_devices(
        &self,
        ctx: &TenantContext,
        project_id: &str,
    ) -> Result<Vec<DeviceStatusRecord>, StorageError> {
        ensure_project_scope(ctx, project_id)?;
        let rows = sqlx::query(
            "select device_id, tenant_id, project_id, last_access_ms, connection_status, \
             (deleted_at is not null) as invalidated \
             from devices where tenant_id = $1 and project_id = $2 \
             order by device_id",
        )
        .bind(&ctx.tenant_id)
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        let mut devices = Vec::with_capacity(rows.len());
        for row in rows {
            devices.push(record_from_row(&row)?);
        }
        Ok(devices)
    }

    async fn find_device(
        &self,
        ctx: &TenantContext,
        project_id: &str,
        device_id: &str,
    ) -> Result<Option<DeviceStatusRecord>, StorageError> {
        ensure_project_scope(ctx, project_id)?;
        let row = sqlx::query(
            "select device_id, tenant_id, project_id, last_access_ms, connection_status, \
             (deleted_at is not null) as invalidated \
             from devices where tenant_id = $1 and project_id = $2 and device_id = $3",
        )
        .bind(&ctx.tenant_id)
        .bind(project_id)
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(record_from_row(&row)?))
    }

    async fn write_status(
        &self,
        ctx: &TenantContext,
        project_id: &str,
        device_id: &str,
        update: DeviceStatusUpdate,
    ) -> Result<(), StorageError> {
        ensure_project_scope(ctx, project_id)?;
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "select (deleted_at is not null) as invalidated from devices \
             where tenant_id = $1 and project_id = $2 and device_id = $3 \
             for update",
        )
        .bind(&ctx.tenant_id)
        .bind(project_id)
        .bind(device_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Err(StorageError::not_found(device_id));
        };
        let invalidated: bool = row.try_get("invalidated")?;
        if invalidated {
            tx.rollback().await?;
            return Err(StorageError::invalidated(device_id));
        }
        sqlx::query(
            "update devices set last_access_ms = $1, connection_status = $2 \
             where tenant_id = $3 and project_id = $4 and device_id = $5",
        )
        .bind(update.last_access_ms)
        .bind(update.connection_status.as_i16())
        .bind(&ctx.tenant_id)
        .bind(project_id)
        .bind(device_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
