// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 本地控制台适配器
//!
//! 该程序把 `routekit` 的分发核心运行在本地进程中，用标准输入代替网络连接：
//! - 每一行 `METHOD /path [json]` 被转换为一个 `Request` 并交给 `App::handle`
//! - 响应以 JSON 形式打印到标准输出
//! - 支持 `help`、`routes`、`status`、`cache on|off`、`stop` 等管理指令

use routekit::{handler_fn, App, BoxError, Config, Context, HealthCheck, Plugin, Request, RequestLogger};

use log::{error, info, warn};
use regex::Regex;
use serde_json::{json, Value};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    runtime::Builder,
    task::JoinSet,
};

use std::sync::Arc;

/// # 程序入口点
///
/// 初始化日志、加载配置，并根据配置的工作线程数创建异步运行时。
fn main() {
    // 1. 初始化日志系统：通过外部 YAML 配置级别与输出目的地
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法加载日志配置config/log4rs.yaml：{}", e);
    }

    // 2. 环境配置加载：从 TOML 文件读取运行参数，ROUTEKIT_ENV 可以覆盖运行环境
    let config = match Config::from_toml("config/development.toml") {
        Ok(config) => config,
        Err(e) => {
            warn!("无法读取配置文件，使用默认配置：{}", e);
            Config::new()
        }
    }
    .with_env_override();
    info!("配置文件已载入，运行环境：{}", config.environment());

    // 3. 异步运行时定制：根据配置文件分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建异步运行时：{}", e);
            return;
        }
    };

    runtime.block_on(run(config));
}

async fn run(config: Config) {
    let plugins: Vec<Box<dyn Plugin>> = vec![
        Box::new(RequestLogger) as Box<dyn Plugin>,
        Box::new(HealthCheck::default()),
    ];
    let app = match App::from_config(&config, plugins) {
        Ok(app) => Arc::new(app),
        Err(e) => {
            error!("插件初始化失败，停止启动：{}", e);
            return;
        }
    };
    register_demo_routes(&app);

    let line_pattern = match Regex::new(r"^([A-Za-z]+)\s+(\S+)(?:\s+(.+))?$") {
        Ok(re) => re,
        Err(e) => {
            error!("无法编译请求行正则：{}", e);
            return;
        }
    };

    println!("输入 `METHOD /path [json]` 发送请求，输入 help 查看指令");
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut input = String::new();
    let mut id: u128 = 0;
    let mut tasks = JoinSet::new();

    loop {
        input.clear();
        match reader.read_line(&mut input).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!("读取标准输入时遇到错误: {}", e);
                break;
            }
        }
        let line = input.trim();
        match line {
            "" => continue,
            "stop" => {
                println!("停机指令已激活，正在退出...");
                break;
            }
            "help" => {
                println!("== routekit Help ==");
                println!("GET /hello/Ada      - 发送请求，可在末尾附带 JSON 请求体");
                println!("routes              - 列出已注册的路由");
                println!("status              - 查看路由版本与缓存状态");
                println!("cache on|off        - 开关匹配缓存");
                println!("stop                - 退出");
                println!("===================");
            }
            "routes" => {
                for route in app.router().routes() {
                    println!("{:<7} {}", route.method(), route.path_pattern());
                }
            }
            "status" => {
                let router = app.router();
                println!("== routekit 状态 ===");
                println!("运行环境: {}", app.environment());
                println!("路由版本: {}", router.version());
                println!("匹配缓存: {}（{}条）", router.is_match_cache_enabled(), router.cache_len());
                println!("插件: {:?}", app.plugin_names());
                println!("===================");
            }
            "cache on" => app.router().set_match_cache_enabled(true),
            "cache off" => app.router().set_match_cache_enabled(false),
            _ => {
                let request = match parse_line(&line_pattern, line) {
                    Ok(request) => request,
                    Err(e) => {
                        println!("无效的输入：{}（{}）", line, e);
                        continue;
                    }
                };
                spawn_request(&mut tasks, Arc::clone(&app), request, id);
                id += 1;
            }
        }
    }

    // 退出前等待尚未完成的请求输出结果
    let pending = drain(&mut tasks).await;
    info!("已等待{}个未完成的请求", pending.len());
}

// 每个请求独立分发，互不阻塞；任务打印并返回渲染后的响应
fn spawn_request(tasks: &mut JoinSet<String>, app: Arc<App>, request: Request, id: u128) {
    tasks.spawn(async move {
        let request_id = id.to_string();
        let mut context = Context::with_request_id(&request_id, app.provider());
        let response = app.handle(request, &mut context).await;
        let line = match serde_json::to_string_pretty(&response) {
            Ok(text) => format!("[ID{}] {}", request_id, text),
            Err(e) => {
                error!("[ID{}]无法序列化响应：{}", request_id, e);
                format!("[ID{}] {}", request_id, response.status_code())
            }
        };
        println!("{}", line);
        line
    });
}

async fn drain(tasks: &mut JoinSet<String>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(line) => lines.push(line),
            Err(e) => error!("请求任务异常退出：{}", e),
        }
    }
    lines
}

fn parse_line(pattern: &Regex, line: &str) -> Result<Request, BoxError> {
    let captures = pattern.captures(line).ok_or("expected `METHOD /path [json]`")?;
    let method = captures.get(1).map_or("GET", |m| m.as_str());
    let path = captures.get(2).map_or("/", |m| m.as_str());
    let mut request = Request::new(method, path).with_header("user-agent", "routekit-console");
    if let Some(body) = captures.get(3) {
        let value: Value = serde_json::from_str(body.as_str())?;
        request = request
            .with_header("content-type", "application/json")
            .with_body(value);
    }
    Ok(request)
}

fn register_demo_routes(app: &App) {
    let router = app.router();
    router.route(
        "GET",
        "/hello/:name",
        handler_fn(|req, _| Ok(json!({ "message": format!("hi, {}", req.param("name").unwrap_or("")) }))),
    );
    router.route(
        "GET",
        "/files/*path",
        handler_fn(|req, _| Ok(json!({ "path": req.param("path") }))),
    );
    router.route(
        "POST",
        "/echo",
        handler_fn(|req, _| Ok(req.body().cloned())),
    );
    router.route(
        "GET",
        "/boom",
        handler_fn(|_, _| -> Result<(), BoxError> { Err("boom requested".into()) }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use routekit::Environment;

    fn demo_app() -> Arc<App> {
        let app = App::new(Vec::new(), Environment::Test).unwrap();
        register_demo_routes(&app);
        Arc::new(app)
    }

    #[tokio::test]
    async fn test_drain_waits_for_every_request() {
        let app = demo_app();
        let mut tasks = JoinSet::new();
        for id in 0..16u128 {
            let request = Request::new("GET", &format!("/hello/user{}", id));
            spawn_request(&mut tasks, Arc::clone(&app), request, id);
        }

        let lines = drain(&mut tasks).await;
        assert_eq!(lines.len(), 16);
        assert!(lines.iter().all(|line| line.contains("\"statusCode\": 200")));
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_drain_keeps_error_responses() {
        let app = demo_app();
        let mut tasks = JoinSet::new();
        spawn_request(&mut tasks, Arc::clone(&app), Request::new("GET", "/boom"), 7);

        let lines = drain(&mut tasks).await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[ID7]"));
        assert!(lines[0].contains("500"));
    }

    #[test]
    fn test_parse_line_with_body() {
        let pattern = Regex::new(r"^([A-Za-z]+)\s+(\S+)(?:\s+(.+))?$").unwrap();
        let request = parse_line(&pattern, r#"post /echo {"a":1}"#).unwrap();
        assert_eq!(request.method(), "POST");
        assert_eq!(request.body(), Some(&json!({"a": 1})));
        assert!(parse_line(&pattern, "nonsense").is_err());
    }
}
