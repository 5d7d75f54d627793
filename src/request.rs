// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求值类型模块
//!
//! 适配器负责把平台相关的请求转换为这里的 `Request`，分发器只读取其中的
//! 方法、路径和标头，并在路由匹配成功后写入路径参数。它涵盖了：
//! 1. 方法名的大写归一化。
//! 2. 从路径中拆分出查询字符串（Query String）。
//! 3. 大小写不敏感的标头访问。

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::param::normalize_method;

/// 表示一次进入路由核心的请求。
///
/// 请求体已由适配器解析为 JSON 值（如果有的话），核心本身不做任何 Body 解析。
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// 大写的 HTTP 请求方法
    method: String,
    /// 原始请求路径（可能包含查询字符串）
    path: String,
    /// 标头，键统一为小写
    headers: HashMap<String, String>,
    /// 查询参数
    query: HashMap<String, String>,
    /// 已解析的请求体
    body: Option<Value>,
    /// 路由匹配后提取出的路径参数
    params: HashMap<String, String>,
}

impl Request {
    /// 构建请求，路径中的查询字符串会被解析到 `query` 中，但 `path` 保持原样。
    pub fn new(method: &str, path: &str) -> Self {
        let query = match path.split_once('?') {
            Some((_, qs)) => parse_query(qs.split('#').next().unwrap_or("")),
            None => HashMap::new(),
        };
        Self {
            method: normalize_method(method),
            path: path.to_string(),
            headers: HashMap::new(),
            query,
            body: None,
            params: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    /// 合并路由匹配得到的参数，同名参数以匹配结果为准
    pub(crate) fn merge_params(&mut self, params: &HashMap<String, String>) {
        for (name, value) in params {
            self.params.insert(name.clone(), value.clone());
        }
    }
}

// --- Getter 访问器实现 ---

impl Request {
    /// 获取请求方法（已大写）
    pub fn method(&self) -> &str {
        &self.method
    }

    /// 获取请求路径（含查询参数）
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 大小写不敏感地读取标头
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|v| v.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// 读取单个路径参数
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|v| v.as_str())
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }
}

/// 解析 `a=1&b=2` 形式的查询字符串，`+` 视为空格，键和值都会做 URL 解码
fn parse_query(qs: &str) -> HashMap<String, String> {
    let mut query = HashMap::new();
    for pair in qs.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        query.insert(decode_component(key), decode_component(value));
    }
    query
}

fn decode_component(raw: &str) -> String {
    let plus_as_space = raw.replace('+', " ");
    percent_decode_str(&plus_as_space)
        .decode_utf8_lossy()
        .into_owned()
}
