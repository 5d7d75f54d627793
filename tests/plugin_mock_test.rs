#[cfg(test)]
mod plugin_mock_tests {
    //! # 插件钩子调用次数测试
    //!
    //! 使用 mockall 模拟插件，确认分发器在成功与失败两条路径上
    //! 对每个钩子的调用次数与顺序。

    use async_trait::async_trait;
    use mockall::{mock, Sequence};
    use routekit::{
        handler_fn, App, BoxError, Context, Exception, Plugin, Request, Response,
    };

    mock! {
        pub Observer {}

        #[async_trait]
        impl Plugin for Observer {
            fn name(&self) -> &'static str;
            async fn on_response(
                &self,
                request: &Request,
                response: &Response,
                context: &mut Context,
            ) -> Result<(), BoxError>;
            async fn on_error(&self, error: &Exception, context: &mut Context);
        }
    }

    fn observer(name: &'static str) -> MockObserver {
        let mut mock = MockObserver::new();
        mock.expect_name().return_const(name);
        mock
    }

    fn app_with(first: MockObserver, second: MockObserver) -> App {
        let app = App::builder()
            .plugin(first)
            .plugin(second)
            .build()
            .expect("mock plugins have no setup");
        app.router()
            .route("GET", "/ok", handler_fn(|_, _| Ok("fine")));
        app.router().route(
            "GET",
            "/fail",
            handler_fn(|_, _| -> Result<(), BoxError> { Err("nope".into()) }),
        );
        app
    }

    #[tokio::test]
    async fn test_error_path_skips_on_response() {
        let mut seq = Sequence::new();
        let mut first = observer("first");
        let mut second = observer("second");

        first.expect_on_response().times(0);
        second.expect_on_response().times(0);
        first
            .expect_on_error()
            .withf(|error, _| error.kind() == "HandlerError")
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        second
            .expect_on_error()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let app = app_with(first, second);
        let response = app.handle_request(Request::new("GET", "/fail")).await;
        assert_eq!(response.status_code(), 500);
    }

    #[tokio::test]
    async fn test_success_path_calls_on_response_once() {
        let mut seq = Sequence::new();
        let mut first = observer("first");
        let mut second = observer("second");

        first
            .expect_on_response()
            .withf(|_, response, _| response.status_code() == 200)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        second
            .expect_on_response()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        first.expect_on_error().times(0);
        second.expect_on_error().times(0);

        let app = app_with(first, second);
        let response = app.handle_request(Request::new("GET", "/ok")).await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.body(), Some(&serde_json::json!("fine")));
    }

    #[tokio::test]
    async fn test_not_found_is_a_normal_response() {
        let mut first = observer("first");
        let mut second = observer("second");

        first
            .expect_on_response()
            .withf(|_, response, _| response.status_code() == 404)
            .times(1)
            .returning(|_, _, _| Ok(()));
        second
            .expect_on_response()
            .times(1)
            .returning(|_, _, _| Ok(()));
        first.expect_on_error().times(0);
        second.expect_on_error().times(0);

        let app = app_with(first, second);
        let response = app.handle_request(Request::new("GET", "/ghost")).await;
        assert_eq!(response.status_code(), 404);
    }
}
