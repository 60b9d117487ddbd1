pub mod device;

pub use device::{ConnectionStatus, HostSignal, StatusReport};

/// 租户上下文：所有模块共享的执行上下文。
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: String,
    pub user_id: String,
    pub project_scope: Option<String>,
}

impl TenantContext {
    /// 构造显式身份与项目范围的租户上下文。
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        project_scope: Option<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            project_scope,
        }
    }

    /// 后台任务使用的系统上下文（限定在单个项目内）。
    pub fn system(tenant_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: "system".to_string(),
            project_scope: Some(project_id.into()),
        }
    }
}

impl Default for TenantContext {
    /// 空上下文（仅用于测试或占位）。
    fn default() -> Self {
        Self {
            tenant_id: "".to_string(),
            user_id: "".to_string(),
            project_scope: None,
        }
    }
}
