//! # 路由处理函数
//!
//! 处理函数接收 `(request, context)`，返回可以归一化为 `Response` 的 `Reply`。
//! 需要异步等待的处理函数直接实现 `Handler`；同步逻辑可以用 `handler_fn` 包装闭包。

use std::marker::PhantomData;

use async_trait::async_trait;

use crate::{context::Context, exception::BoxError, request::Request, response::Reply};

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, request: &Request, context: &mut Context) -> Result<Reply, BoxError>;
}

/// 由 `handler_fn` 生成的闭包处理函数
pub struct FnHandler<F, T> {
    f: F,
    _reply: PhantomData<fn() -> T>,
}

/// 把同步闭包包装为 `Handler`。
///
/// 闭包可以返回任何实现了 `Into<Reply>` 的值，例如 `Response`、`serde_json::Value`、
/// `String` 或 `()`；错误统一为 `BoxError`，因此闭包内部可以直接使用 `?`。
pub fn handler_fn<F, T>(f: F) -> FnHandler<F, T>
where
    F: Fn(&Request, &mut Context) -> Result<T, BoxError> + Send + Sync + 'static,
    T: Into<Reply>,
{
    FnHandler {
        f,
        _reply: PhantomData,
    }
}

#[async_trait]
impl<F, T> Handler for FnHandler<F, T>
where
    F: Fn(&Request, &mut Context) -> Result<T, BoxError> + Send + Sync + 'static,
    T: Into<Reply>,
{
    async fn call(&self, request: &Request, context: &mut Context) -> Result<Reply, BoxError> {
        (self.f)(request, context).map(Into::into)
    }
}
