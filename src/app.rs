// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 分发器
//!
//! `App` 持有路由表与插件列表，把一个 `Request` 转换为一个 `Response`：
//!
//! ```text
//! matching -> on_request 钩子 -> 处理函数 / 404 -> on_response 钩子 -> done
//!     \____________________任意阶段出错____________________/
//!                              |
//!                  on_error 钩子 -> 500 响应 -> done
//! ```
//!
//! - 同一请求内的钩子严格按注册顺序依次等待完成；不同请求之间完全并发。
//! - 处理函数或钩子返回的 `Err` 以及其中发生的 panic 都只在 `handle` 顶层被捕获一次。
//! - 出错时不会执行 `on_response`。

use std::{future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures_util::FutureExt;
use log::{debug, info, warn};

use crate::{
    config::{Config, Environment},
    context::Context,
    exception::{Exception, Stage},
    param::DEFAULT_PROVIDER,
    plugin::Plugin,
    request::Request,
    response::Response,
    router::Router,
};

pub struct App {
    router: Arc<Router>,
    plugins: Vec<Box<dyn Plugin>>,
    environment: Environment,
    provider: String,
}

pub struct AppBuilder {
    router: Router,
    plugins: Vec<Box<dyn Plugin>>,
    environment: Environment,
    provider: String,
}

impl AppBuilder {
    /// 追加一个插件，执行顺序即追加顺序
    pub fn plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn provider(mut self, provider: &str) -> Self {
        self.provider = provider.to_string();
        self
    }

    /// 使用预先配置好的路由表（例如调整了缓存容量，或已注册了路由）
    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    pub fn build(self) -> Result<App, Exception> {
        App::assemble(self.router, self.plugins, self.environment, self.provider)
    }
}

impl App {
    /// 依次调用每个插件的 `setup`。任何一个失败都会直接返回错误，不会被吞掉。
    pub fn new(plugins: Vec<Box<dyn Plugin>>, environment: Environment) -> Result<Self, Exception> {
        Self::assemble(Router::new(), plugins, environment, DEFAULT_PROVIDER.to_string())
    }

    pub fn builder() -> AppBuilder {
        AppBuilder {
            router: Router::new(),
            plugins: Vec::new(),
            environment: Environment::default(),
            provider: DEFAULT_PROVIDER.to_string(),
        }
    }

    /// 按配置文件中的缓存容量、缓存开关、运行环境和部署名称构建
    pub fn from_config(config: &Config, plugins: Vec<Box<dyn Plugin>>) -> Result<Self, Exception> {
        let router = Router::with_cache_capacity(config.match_cache_capacity());
        router.set_match_cache_enabled(config.match_cache_enabled());
        Self::assemble(
            router,
            plugins,
            config.environment(),
            config.provider().to_string(),
        )
    }

    fn assemble(
        router: Router,
        plugins: Vec<Box<dyn Plugin>>,
        environment: Environment,
        provider: String,
    ) -> Result<Self, Exception> {
        for plugin in &plugins {
            plugin.setup(&router).map_err(|source| Exception::Setup {
                plugin: plugin.name().to_string(),
                source,
            })?;
            debug!("插件{}初始化完成", plugin.name());
        }
        info!(
            "应用已创建：环境{}，部署{}，插件{}个，路由{}条",
            environment,
            provider,
            plugins.len(),
            router.routes().len()
        );
        Ok(Self {
            router: Arc::new(router),
            plugins,
            environment,
            provider,
        })
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// 为请求创建新的 `Context` 后分发，供不自带请求 ID 的适配器使用
    pub async fn handle_request(&self, request: Request) -> Response {
        let mut context = Context::new(&self.provider);
        self.handle(request, &mut context).await
    }

    /// 处理一个请求，总是返回一个完整的响应。
    pub async fn handle(&self, mut request: Request, context: &mut Context) -> Response {
        context.begin(request.method(), request.path());

        let response = match self.dispatch(&mut request, context).await {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    "[ID{}]{} {} 分发失败，返回500：{}",
                    context.request_id(),
                    request.method(),
                    request.path(),
                    error
                );
                for plugin in &self.plugins {
                    plugin.on_error(&error, context).await;
                }
                Response::internal_error(&error, !self.environment.is_production())
            }
        };

        context.finish();
        response
    }

    async fn dispatch(&self, request: &mut Request, context: &mut Context) -> Result<Response, Exception> {
        let matched = self.router.match_route(request.method(), request.path());
        if let Some(m) = &matched {
            request.merge_params(&m.params);
            context.set_route_pattern(&m.route_pattern);
        }
        let request: &Request = request;

        let mut short_circuit = None;
        for plugin in &self.plugins {
            let outcome = guard(Stage::OnRequest, async {
                plugin
                    .on_request(request, context)
                    .await
                    .map_err(|source| Exception::Hook {
                        plugin: plugin.name().to_string(),
                        stage: Stage::OnRequest,
                        source,
                    })
            })
            .await?;
            if let Some(response) = outcome {
                debug!(
                    "[ID{}]插件{}提前返回响应，跳过处理函数",
                    context.request_id(),
                    plugin.name()
                );
                short_circuit = Some(response);
                break;
            }
        }

        let response = match (short_circuit, matched) {
            (Some(response), _) => response,
            (None, None) => {
                debug!(
                    "[ID{}]未找到路由：{} {}",
                    context.request_id(),
                    request.method(),
                    request.path()
                );
                Response::not_found(request.method(), request.path())
            }
            (None, Some(m)) => {
                let reply = guard(Stage::Handler, async {
                    m.route
                        .handler()
                        .call(request, context)
                        .await
                        .map_err(|source| Exception::Handler {
                            route: m.route_pattern.clone(),
                            source,
                        })
                })
                .await?;
                reply.into_response()
            }
        };

        for plugin in &self.plugins {
            guard(Stage::OnResponse, async {
                plugin
                    .on_response(request, &response, context)
                    .await
                    .map_err(|source| Exception::Hook {
                        plugin: plugin.name().to_string(),
                        stage: Stage::OnResponse,
                        source,
                    })
            })
            .await?;
        }

        Ok(response)
    }
}

// 把钩子或处理函数中的 panic 转换为 Exception::Panic
async fn guard<T, F>(stage: Stage, fut: F) -> Result<T, Exception>
where
    F: Future<Output = Result<T, Exception>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Exception::from_panic(stage, payload)),
    }
}
