// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了分发器在请求处理生命周期中可能遇到的各类故障。
//!
//! ## 设计意图
//! - **错误分类**：区分处理函数故障、插件钩子故障、panic 以及启动阶段的插件配置故障。
//! - **语义映射**：除 `Setup` 外的所有变体都会在 `App::handle` 中被捕获一次，并转化为 500 响应；
//!   `Setup` 则直接返回给 `App::new` 的调用者，让进程在启动时就失败。
//! - **可调试性**：`detail()` 生成 `{message, kind, stack}` 结构，非生产环境下会写入响应体。

use std::{any::Any, error::Error, fmt};

use serde_derive::Serialize;

/// 处理函数与插件返回的通用错误类型
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// 故障发生时所处的生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 插件 `setup`，仅在构造 `App` 时执行
    Setup,
    /// 插件 `on_request`
    OnRequest,
    /// 路由处理函数
    Handler,
    /// 插件 `on_response`
    OnResponse,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Stage::Setup => write!(f, "setup"),
            Stage::OnRequest => write!(f, "on_request"),
            Stage::Handler => write!(f, "handler"),
            Stage::OnResponse => write!(f, "on_response"),
        }
    }
}

/// 请求分发过程中发生的故障。
#[derive(Debug)]
pub enum Exception {
    /// 路由处理函数返回了 `Err`。
    Handler { route: String, source: BoxError },
    /// 插件的 `on_request` 或 `on_response` 钩子返回了 `Err`。
    Hook {
        plugin: String,
        stage: Stage,
        source: BoxError,
    },
    /// 处理函数或钩子在执行过程中 panic，`message` 为 panic 载荷的文本形式。
    Panic { stage: Stage, message: String },
    /// 插件 `setup` 失败。该故障不会被 `handle` 捕获，而是中止 `App` 的构造。
    Setup { plugin: String, source: BoxError },
}

use Exception::*;

/// 序列化后的错误详情，仅在非生产环境下写入 500 响应体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub kind: String,
    pub stack: Vec<String>,
}

impl Exception {
    /// 稳定的错误类别标识，用于日志和响应体中的 `kind` 字段
    pub fn kind(&self) -> &'static str {
        match self {
            Handler { .. } => "HandlerError",
            Hook { .. } => "HookError",
            Panic { .. } => "Panic",
            Setup { .. } => "SetupError",
        }
    }

    /// 故障发生的阶段
    pub fn stage(&self) -> Stage {
        match self {
            Handler { .. } => Stage::Handler,
            Hook { stage, .. } | Panic { stage, .. } => *stage,
            Setup { .. } => Stage::Setup,
        }
    }

    /// 由 `catch_unwind` 得到的 panic 载荷构建异常
    pub fn from_panic(stage: Stage, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Panic { stage, message }
    }

    /// 生成 `{message, kind, stack}` 形式的错误详情。
    ///
    /// `stack` 由错误的 `source()` 链构成，第一项是直接原因。
    pub fn detail(&self) -> ErrorDetail {
        let mut stack = vec![format!("at {}", self.stage())];
        let mut cause = self.source();
        while let Some(err) = cause {
            stack.push(err.to_string());
            cause = err.source();
        }
        ErrorDetail {
            message: self.to_string(),
            kind: self.kind().to_string(),
            stack,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler { route, source } => write!(f, "Handler for {} failed: {}", route, source),
            Hook {
                plugin,
                stage,
                source,
            } => write!(f, "Plugin {} failed in {}: {}", plugin, stage, source),
            Panic { stage, message } => write!(f, "Panicked in {}: {}", stage, message),
            Setup { plugin, source } => write!(f, "Plugin {} failed to set up: {}", plugin, source),
        }
    }
}

impl Error for Exception {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Handler { source, .. } | Hook { source, .. } | Setup { source, .. } => {
                Some(source.as_ref())
            }
            Panic { .. } => None,
        }
    }
}
