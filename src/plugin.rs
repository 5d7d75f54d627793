//! # 插件
//!
//! 插件是实现了 `Plugin` 的对象，所有钩子都有默认的空实现，插件只需覆盖自己关心的部分：
//!
//! ```text
//! setup(router)                       构造 App 时调用一次，可注册自己的路由
//! on_request(request, context)        处理函数之前，按注册顺序依次执行
//! on_response(request, response, ..)  成功分发之后，按注册顺序依次执行，只观察不修改
//! on_error(error, context)            分发失败时，按注册顺序依次执行
//! ```

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info};
use serde_json::json;

use crate::{
    context::Context,
    exception::{BoxError, Exception},
    handler::handler_fn,
    request::Request,
    response::Response,
    router::{RouteDefinition, Router},
};

#[async_trait]
pub trait Plugin: Send + Sync {
    /// 插件名称，出现在日志和错误信息中
    fn name(&self) -> &'static str {
        "anonymous"
    }

    /// 返回 `Err` 会中止 `App` 的构造
    fn setup(&self, _router: &Router) -> Result<(), BoxError> {
        Ok(())
    }

    /// 返回 `Some(response)` 时跳过后续的 `on_request` 与处理函数，直接以该响应作为结果
    async fn on_request(
        &self,
        _request: &Request,
        _context: &mut Context,
    ) -> Result<Option<Response>, BoxError> {
        Ok(None)
    }

    async fn on_response(
        &self,
        _request: &Request,
        _response: &Response,
        _context: &mut Context,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    async fn on_error(&self, _error: &Exception, _context: &mut Context) {}
}

/// 为每个请求输出一行访问日志，并记录分发失败
pub struct RequestLogger;

#[async_trait]
impl Plugin for RequestLogger {
    fn name(&self) -> &'static str {
        "request-logger"
    }

    async fn on_request(
        &self,
        request: &Request,
        context: &mut Context,
    ) -> Result<Option<Response>, BoxError> {
        debug!(
            "[ID{}]收到请求：{} {}，路由模式：{}",
            context.request_id(),
            request.method(),
            request.path(),
            context.route_pattern().unwrap_or("-")
        );
        Ok(None)
    }

    async fn on_response(
        &self,
        request: &Request,
        response: &Response,
        context: &mut Context,
    ) -> Result<(), BoxError> {
        let elapsed = context
            .dispatch()
            .started_at
            .map(|start| (Utc::now() - start).num_milliseconds())
            .unwrap_or(0);
        info!(
            "[ID{}] {}, {}, {}, {}, {}, {}ms",
            context.request_id(),
            context.provider(),
            request.method(),
            request.path(),
            response.status_code(),
            response.information(),
            elapsed,
        );
        Ok(())
    }

    async fn on_error(&self, error: &Exception, context: &mut Context) {
        error!(
            "[ID{}]分发 {} {} 失败（{}）：{}",
            context.request_id(),
            context.dispatch().method,
            context.dispatch().path,
            error.kind(),
            error
        );
    }
}

/// 在 `setup` 阶段注册健康检查路由
pub struct HealthCheck {
    path: String,
}

impl HealthCheck {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new("/health")
    }
}

#[async_trait]
impl Plugin for HealthCheck {
    fn name(&self) -> &'static str {
        "health-check"
    }

    fn setup(&self, router: &Router) -> Result<(), BoxError> {
        if !self.path.starts_with('/') {
            return Err(format!("health check path must start with '/': {}", self.path).into());
        }
        router.register(
            RouteDefinition::new(
                "GET",
                &self.path,
                handler_fn(|_, ctx| {
                    Ok(json!({
                        "status": "ok",
                        "provider": ctx.provider(),
                    }))
                }),
            )
            .metadata("internal", json!(true)),
        );
        Ok(())
    }
}
