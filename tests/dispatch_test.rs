// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

#[cfg(test)]
mod dispatch_tests {
    //! # 分发生命周期测试套件
    //!
    //! 覆盖范围包括：
    //! - 钩子执行顺序 (Hook Ordering)
    //! - 错误隔离与 on_error 钩子 (Error Isolation)
    //! - 按运行环境屏蔽错误详情 (Environment-gated Detail)
    //! - 返回值归一化与 404 (Normalization / Not Found)
    //! - 并发请求之间互不干扰 (Concurrency)

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use routekit::{
        handler_fn, App, BoxError, Context, Environment, Exception, Handler, Plugin, Reply,
        Request, Response,
    };
    use serde_json::json;

    type Events = Arc<Mutex<Vec<String>>>;

    /// 把每次钩子调用记录为 `req<名称>` / `res<名称>` / `err<名称>`
    struct Recorder {
        name: &'static str,
        events: Events,
    }

    #[async_trait]
    impl Plugin for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn on_request(
            &self,
            _request: &Request,
            _context: &mut Context,
        ) -> Result<Option<Response>, BoxError> {
            // 让出执行权，确认顺序不是同步执行带来的巧合
            tokio::task::yield_now().await;
            self.events.lock().unwrap().push(format!("req{}", self.name));
            Ok(None)
        }

        async fn on_response(
            &self,
            _request: &Request,
            _response: &Response,
            _context: &mut Context,
        ) -> Result<(), BoxError> {
            tokio::task::yield_now().await;
            self.events.lock().unwrap().push(format!("res{}", self.name));
            Ok(())
        }

        async fn on_error(&self, error: &Exception, _context: &mut Context) {
            self.events
                .lock()
                .unwrap()
                .push(format!("err{}:{}", self.name, error.kind()));
        }
    }

    /// 在指定阶段返回错误的插件
    struct FailingHook {
        on_request: bool,
    }

    #[async_trait]
    impl Plugin for FailingHook {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn on_request(
            &self,
            _request: &Request,
            _context: &mut Context,
        ) -> Result<Option<Response>, BoxError> {
            if self.on_request {
                Err("rejected in on_request".into())
            } else {
                Ok(None)
            }
        }

        async fn on_response(
            &self,
            _request: &Request,
            _response: &Response,
            _context: &mut Context,
        ) -> Result<(), BoxError> {
            if self.on_request {
                Ok(())
            } else {
                Err("rejected in on_response".into())
            }
        }
    }

    fn recorders(events: &Events) -> App {
        App::builder()
            .environment(Environment::Test)
            .plugin(Recorder {
                name: "A",
                events: Arc::clone(events),
            })
            .plugin(Recorder {
                name: "B",
                events: Arc::clone(events),
            })
            .plugin(Recorder {
                name: "C",
                events: Arc::clone(events),
            })
            .build()
            .unwrap()
    }

    fn failing_handler() -> impl Handler {
        handler_fn(|_, _| -> Result<(), BoxError> { Err("database unavailable".into()) })
    }

    /// ## 钩子顺序
    /// 三个插件按 A、B、C 注册，一次成功的请求应产生 reqA, reqB, reqC, resA, resB, resC。
    #[tokio::test]
    async fn test_hook_ordering() {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let app = recorders(&events);
        let log = Arc::clone(&events);
        app.router().route(
            "GET",
            "/ping",
            handler_fn(move |_, _| {
                log.lock().unwrap().push("handler".to_string());
                Ok("pong")
            }),
        );

        let response = app.handle_request(Request::new("GET", "/ping")).await;

        assert_eq!(response.status_code(), 200);
        assert_eq!(
            *events.lock().unwrap(),
            vec!["reqA", "reqB", "reqC", "handler", "resA", "resB", "resC"]
        );
    }

    /// ## 错误隔离
    /// 处理函数失败时返回 500，on_response 不执行，on_error 按注册顺序各执行一次。
    #[tokio::test]
    async fn test_handler_error_isolation() {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let app = recorders(&events);
        app.router().route("GET", "/fail", failing_handler());

        let response = app.handle_request(Request::new("GET", "/fail")).await;

        assert_eq!(response.status_code(), 500);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "reqA",
                "reqB",
                "reqC",
                "errA:HandlerError",
                "errB:HandlerError",
                "errC:HandlerError",
            ]
        );
    }

    /// on_request 钩子失败时不再调用后续钩子和处理函数
    #[tokio::test]
    async fn test_on_request_error_stops_pipeline() {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let called = Arc::new(Mutex::new(false));
        let app = App::builder()
            .plugin(Recorder {
                name: "A",
                events: Arc::clone(&events),
            })
            .plugin(FailingHook { on_request: true })
            .plugin(Recorder {
                name: "C",
                events: Arc::clone(&events),
            })
            .build()
            .unwrap();
        let flag = Arc::clone(&called);
        app.router().route(
            "GET",
            "/x",
            handler_fn(move |_, _| {
                *flag.lock().unwrap() = true;
                Ok(())
            }),
        );

        let response = app.handle_request(Request::new("GET", "/x")).await;

        assert_eq!(response.status_code(), 500);
        assert!(!*called.lock().unwrap());
        assert_eq!(
            *events.lock().unwrap(),
            vec!["reqA", "errA:HookError", "errC:HookError"]
        );
        let error = &response.body().unwrap()["error"];
        assert_eq!(error["message"], "Plugin failing failed in on_request: rejected in on_request");
    }

    /// on_response 钩子失败同样转换为 500，且错误响应不会再次经过 on_response
    #[tokio::test]
    async fn test_on_response_error_is_contained() {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let app = App::builder()
            .plugin(Recorder {
                name: "A",
                events: Arc::clone(&events),
            })
            .plugin(FailingHook { on_request: false })
            .plugin(Recorder {
                name: "C",
                events: Arc::clone(&events),
            })
            .build()
            .unwrap();
        app.router().route("GET", "/x", handler_fn(|_, _| Ok(())));

        let response = app.handle_request(Request::new("GET", "/x")).await;

        assert_eq!(response.status_code(), 500);
        assert_eq!(
            *events.lock().unwrap(),
            vec!["reqA", "reqC", "resA", "errA:HookError", "errC:HookError"]
        );
    }

    /// ## 按运行环境屏蔽错误详情
    #[tokio::test]
    async fn test_error_detail_depends_on_environment() {
        for (environment, exposed) in [
            (Environment::Development, true),
            (Environment::Test, true),
            (Environment::Production, false),
        ] {
            let app = App::builder().environment(environment).build().unwrap();
            app.router().route("GET", "/fail", failing_handler());

            let response = app.handle_request(Request::new("GET", "/fail")).await;
            assert_eq!(response.status_code(), 500);

            let body = response.body().unwrap();
            assert_eq!(body["message"], "Internal Server Error");
            if exposed {
                assert_eq!(body["error"]["kind"], "HandlerError");
                assert_eq!(
                    body["error"]["message"],
                    "Handler for /fail failed: database unavailable"
                );
                assert_eq!(body["error"]["stack"][1], "database unavailable");
            } else {
                assert_eq!(*body, json!({"message": "Internal Server Error"}));
            }
        }
    }

    /// ## 具体场景：路径参数与普通值归一化
    #[tokio::test]
    async fn test_hello_scenario() {
        let app = App::builder().build().unwrap();
        let seen = Arc::new(Mutex::new(None));
        let captured = Arc::clone(&seen);
        app.router().route(
            "GET",
            "/hello/:name",
            handler_fn(move |req, _| {
                *captured.lock().unwrap() = Some(req.params().clone());
                Ok(json!({"message": "hi"}))
            }),
        );

        let response = app.handle_request(Request::new("GET", "/hello/Ada?x=1")).await;

        let params = seen.lock().unwrap().clone().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params["name"], "Ada");
        assert_eq!(response, Response::new(200).with_body(json!({"message": "hi"})));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"statusCode": 200, "body": {"message": "hi"}})
        );
    }

    /// ## 具体场景：未注册的路由
    #[tokio::test]
    async fn test_ghost_route_is_404() {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let app = recorders(&events);

        let response = app.handle_request(Request::new("DELETE", "/ghost")).await;

        assert_eq!(response.status_code(), 404);
        let body = response.body().unwrap();
        assert_eq!(body["message"], "Route not found");
        assert_eq!(body["method"], "DELETE");
        assert_eq!(body["path"], "/ghost");
        assert_eq!(
            *events.lock().unwrap(),
            vec!["reqA", "reqB", "reqC", "resA", "resB", "resC"]
        );
    }

    /// 处理函数返回的结构化响应原样透传
    #[tokio::test]
    async fn test_structured_response_passes_through() {
        struct Created;

        #[async_trait]
        impl Handler for Created {
            async fn call(&self, request: &Request, _: &mut Context) -> Result<Reply, BoxError> {
                let body = request.body().cloned().unwrap_or_default();
                Ok(Response::json(201, body).with_header("Location", "/users/1").into())
            }
        }

        let app = App::builder().build().unwrap();
        app.router().route("POST", "/users", Created);

        let response = app
            .handle_request(Request::new("post", "/users").with_body(json!({"name": "Ada"})))
            .await;

        assert_eq!(response.status_code(), 201);
        assert_eq!(response.header("location"), Some("/users/1"));
        assert_eq!(response.body(), Some(&json!({"name": "Ada"})));
    }

    /// 插件写入的服务可以被处理函数读取
    #[tokio::test]
    async fn test_plugin_publishes_service() {
        struct Tenant;

        #[async_trait]
        impl Plugin for Tenant {
            async fn on_request(
                &self,
                request: &Request,
                context: &mut Context,
            ) -> Result<Option<Response>, BoxError> {
                let tenant = request.header("x-tenant").unwrap_or("public").to_string();
                context.insert_service("tenant", tenant);
                Ok(None)
            }
        }

        let app = App::builder().plugin(Tenant).build().unwrap();
        app.router().route(
            "GET",
            "/whoami",
            handler_fn(|_, ctx| {
                let tenant = ctx.service::<String>("tenant").ok_or("tenant missing")?;
                Ok(json!({"tenant": tenant.as_str()}))
            }),
        );

        let response = app
            .handle_request(Request::new("GET", "/whoami").with_header("X-Tenant", "acme"))
            .await;
        assert_eq!(response.body(), Some(&json!({"tenant": "acme"})));
    }

    /// ## 并发
    /// 不同请求的钩子链并发执行，但每个请求内部仍保持顺序。
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_keep_per_request_order() {
        struct PerRequest;

        #[async_trait]
        impl Plugin for PerRequest {
            async fn on_request(
                &self,
                _request: &Request,
                context: &mut Context,
            ) -> Result<Option<Response>, BoxError> {
                tokio::task::yield_now().await;
                context.set_metadata("trail", json!(["req"]));
                Ok(None)
            }

            async fn on_response(
                &self,
                _request: &Request,
                _response: &Response,
                context: &mut Context,
            ) -> Result<(), BoxError> {
                let mut trail = context.metadata("trail").cloned().unwrap_or(json!([]));
                if let Some(items) = trail.as_array_mut() {
                    items.push(json!("res"));
                }
                context.set_metadata("trail", trail);
                Ok(())
            }
        }

        let app = Arc::new(App::builder().plugin(PerRequest).build().unwrap());
        app.router().route(
            "GET",
            "/items/:id",
            handler_fn(|req, ctx| {
                let mut trail = ctx.metadata("trail").cloned().unwrap_or(json!([]));
                if let Some(items) = trail.as_array_mut() {
                    items.push(json!("handler"));
                }
                ctx.set_metadata("trail", trail);
                Ok(json!({"id": req.param("id")}))
            }),
        );

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let app = Arc::clone(&app);
                tokio::spawn(async move {
                    let mut ctx = Context::with_request_id(&i.to_string(), "local");
                    let response = app
                        .handle(Request::new("GET", &format!("/items/{}", i)), &mut ctx)
                        .await;
                    (i, response, ctx.metadata("trail").cloned())
                })
            })
            .collect();

        for task in tasks {
            let (i, response, trail) = task.await.unwrap();
            assert_eq!(response.body(), Some(&json!({"id": i.to_string()})));
            assert_eq!(trail, Some(json!(["req", "handler", "res"])));
        }
    }
}
