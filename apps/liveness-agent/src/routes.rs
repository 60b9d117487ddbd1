//! 路由定义
//!
//! - 健康检查：/health
//! - 设备连接状态：/api/devices
//! - 宿主生命周期：/api/lifecycle, /api/lifecycle/active, /api/lifecycle/inactive
//! - 指标：/metrics

use crate::AppState;
use crate::handlers::*;
use crate::middleware::request_context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/api/devices", get(list_devices))
        .route("/api/lifecycle", get(get_lifecycle))
        .route("/api/lifecycle/active", post(became_active))
        .route("/api/lifecycle/inactive", post(will_resign_active))
}

/// 完整应用：路由 + 请求追踪。
pub fn create_router(state: AppState) -> Router {
    create_api_router().with_state(state).layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(request_context))
            .layer(TraceLayer::new_for_http()),
    )
}
