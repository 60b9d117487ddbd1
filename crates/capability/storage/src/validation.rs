//! 验证辅助函数
//!
//! - ensure_tenant：验证租户 ID 非空
//! - ensure_project_scope：验证项目归属（租户 + 项目作用域）

use crate::error::StorageError;
use domain::TenantContext;

/// 验证租户 ID 非空
pub fn ensure_tenant(ctx: &TenantContext) -> Result<(), StorageError> {
    if ctx.tenant_id.is_empty() {
        return Err(StorageError::scope("tenant_id required"));
    }
    Ok(())
}

/// 验证项目归属
///
/// 上下文带有项目范围时，只允许访问该项目内的设备。
pub fn ensure_project_scope(ctx: &TenantContext, project_id: &str) -> Result<(), StorageError> {
    ensure_tenant(ctx)?;
    if let Some(scope) = ctx.project_scope.as_deref() {
        if scope != project_id {
            return Err(StorageError::scope("project scope mismatch"));
        }
    }
    Ok(())
}
