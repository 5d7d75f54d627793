//! # 请求上下文
//!
//! 每个请求独占一个 `Context`，由适配器或 `App::handle_request` 创建，在 `handle`
//! 返回后销毁。插件可以通过 `services` 发布能力（例如数据库连接、当前用户），
//! 通过 `metadata` 传递任意附加信息。

use std::{any::Any, collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// 分发器写入的路由与计时信息
#[derive(Debug, Clone, Default)]
pub struct Dispatch {
    pub method: String,
    pub path: String,
    /// 命中的路由模式，未命中时为 `None`
    pub route_pattern: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

pub struct Context {
    request_id: String,
    provider: String,
    services: HashMap<String, Arc<dyn Any + Send + Sync>>,
    metadata: HashMap<String, Value>,
    dispatch: Dispatch,
}

impl Context {
    /// 使用随机生成的 UUID 作为请求 ID
    pub fn new(provider: &str) -> Self {
        Self::with_request_id(&Uuid::new_v4().to_string(), provider)
    }

    /// 适配器已有请求 ID（例如平台注入的 trace id）时使用
    pub fn with_request_id(request_id: &str, provider: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            provider: provider.to_string(),
            services: HashMap::new(),
            metadata: HashMap::new(),
            dispatch: Dispatch::default(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// 发布一个服务，同名服务会被覆盖
    pub fn insert_service<T: Any + Send + Sync>(&mut self, name: &str, service: T) {
        self.services.insert(name.to_string(), Arc::new(service));
    }

    /// 按名称和类型取出服务，类型不符时返回 `None`
    pub fn service<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.services
            .get(name)
            .cloned()
            .and_then(|s| s.downcast::<T>().ok())
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn set_metadata(&mut self, key: &str, value: Value) {
        self.metadata.insert(key.to_string(), value);
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn route_pattern(&self) -> Option<&str> {
        self.dispatch.route_pattern.as_deref()
    }

    /// 请求耗时（毫秒），分发尚未结束时返回 `None`
    pub fn elapsed_ms(&self) -> Option<i64> {
        match (self.dispatch.started_at, self.dispatch.ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }

    pub(crate) fn begin(&mut self, method: &str, path: &str) {
        self.dispatch.method = method.to_string();
        self.dispatch.path = path.to_string();
        self.dispatch.started_at = Some(Utc::now());
    }

    pub(crate) fn set_route_pattern(&mut self, pattern: &str) {
        self.dispatch.route_pattern = Some(pattern.to_string());
    }

    pub(crate) fn finish(&mut self) {
        self.dispatch.ended_at = Some(Utc::now());
    }
}
