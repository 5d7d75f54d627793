// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由核心协议参数与常量模块
//!
//! 该模块定义了 `routekit` 路由与分发核心共享的常量，包括：
//! - 路径模式中参数段与通配段的标记符。
//! - 匹配缓存的默认容量。
//! - 常见的 HTTP 状态码及其原因短语（Reason Phrase）。

use std::collections::HashMap;
use lazy_static::lazy_static;

/// 框架名称标识，用于响应头的 `Server` 字段以及日志前缀
pub const SERVER_NAME: &str = "routekit";

/// 路径分隔符
pub const PATH_SEPARATOR: char = '/';

/// 参数段标记，例如 `/users/:id`
pub const PARAM_MARKER: char = ':';

/// 通配段标记，例如 `/files/*rest`
pub const WILDCARD_MARKER: char = '*';

/// 通配段未写名称时（仅有一个 `*`）使用的参数名
pub const DEFAULT_WILDCARD_NAME: &str = "wildcard";

/// 匹配缓存的默认容量
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// 未显式配置时 Context 中记录的部署名称
pub const DEFAULT_PROVIDER: &str = "local";

/// 读取运行环境时使用的环境变量名
pub const ENVIRONMENT_VAR: &str = "ROUTEKIT_ENV";

/// 404 响应体中的固定提示信息
pub const NOT_FOUND_MESSAGE: &str = "Route not found";

/// 500 响应体中的固定提示信息
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        // 1xx: 信息响应 (Informational)
        map.insert(100, "Continue");
        map.insert(101, "Switching Protocols");

        // 2xx: 成功响应 (Successful)
        map.insert(200, "OK");
        map.insert(201, "Created");
        map.insert(202, "Accepted");
        map.insert(204, "No Content");
        map.insert(206, "Partial Content");

        // 3xx: 重定向 (Redirection)
        map.insert(301, "Moved Permanently");
        map.insert(302, "Found");
        map.insert(303, "See Other");
        map.insert(304, "Not Modified");
        map.insert(307, "Temporary Redirect");
        map.insert(308, "Permanent Redirect");

        // 4xx: 客户端错误 (Client Error)
        map.insert(400, "Bad Request");
        map.insert(401, "Unauthorized");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(406, "Not Acceptable");
        map.insert(408, "Request Timeout");
        map.insert(409, "Conflict");
        map.insert(410, "Gone");
        map.insert(413, "Content Too Large");
        map.insert(415, "Unsupported Media Type");
        map.insert(418, "I'm a teapot");
        map.insert(422, "Unprocessable Content");
        map.insert(429, "Too Many Requests");

        // 5xx: 服务端错误 (Server Error)
        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(502, "Bad Gateway");
        map.insert(503, "Service Unavailable");
        map.insert(504, "Gateway Timeout");
        map
    };
}

/// 方法名统一转换为大写，存储与查找前都必须经过这一步
pub fn normalize_method(method: &str) -> String {
    method.trim().to_uppercase()
}

/// 查询状态码的原因短语，未知状态码返回空字符串
pub fn reason_phrase(code: u16) -> &'static str {
    STATUS_CODES.get(&code).copied().unwrap_or("")
}
