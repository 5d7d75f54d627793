use crate::{
    exception::Exception,
    param::{reason_phrase, INTERNAL_ERROR_MESSAGE, NOT_FOUND_MESSAGE, SERVER_NAME},
};

use serde_derive::Serialize;
use serde_json::{json, Value};

use std::collections::HashMap;

/// 分发器返回给适配器的响应。
///
/// 响应体保持为 JSON 值，由适配器决定最终的编码方式。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    status_code: u16,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
}

impl Response {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// 不带响应体的 200
    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn json(status_code: u16, body: Value) -> Self {
        Self::new(status_code)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// 未匹配到路由时的标准响应
    pub fn not_found(method: &str, path: &str) -> Self {
        Self::json(
            404,
            json!({
                "message": NOT_FOUND_MESSAGE,
                "method": method,
                "path": path,
            }),
        )
    }

    /// 分发过程中出现故障时合成的 500 响应。
    ///
    /// `expose_detail` 为 false（生产环境）时不携带任何内部错误信息。
    pub fn internal_error(error: &Exception, expose_detail: bool) -> Self {
        let body = if expose_detail {
            json!({
                "message": INTERNAL_ERROR_MESSAGE,
                "error": error.detail(),
            })
        } else {
            json!({ "message": INTERNAL_ERROR_MESSAGE })
        };
        Self::json(500, body).with_header("server", SERVER_NAME)
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// 状态码对应的原因短语
    pub fn information(&self) -> &'static str {
        reason_phrase(self.status_code)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|v| v.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// 处理函数的返回值，在分发器中被归一化为 `Response`。
///
/// - `Response`：原样透传；
/// - `Empty`：不带响应体的 200；
/// - `Value`：状态码为 200，值作为响应体。
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Response(Response),
    Empty,
    Value(Value),
}

impl Reply {
    /// 把任意可序列化的值作为响应体
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Reply::Value(serde_json::to_value(value)?))
    }

    pub fn into_response(self) -> Response {
        match self {
            Reply::Response(response) => response,
            Reply::Empty | Reply::Value(Value::Null) => Response::ok(),
            Reply::Value(value) => Response::new(200).with_body(value),
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Value(Value::String(text))
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Value(Value::String(text.to_string()))
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Reply::Empty,
        }
    }
}
