use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde_json::Value;
use std::time::Duration;

/// 一次请求的完整响应快照
///
/// `json` 仅在 Content-Type 含 application/json 且响应体可解析时填充，
/// 其余情况保持 None（json_path 断言依赖这一点报错）。
#[derive(Debug, Clone)]
pub struct ResponseCapture {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    pub json: Option<Value>,
    pub response_time_ms: f64,
}

impl ResponseCapture {
    pub fn new(status: u16, headers: HeaderMap, body: String, elapsed: Duration) -> Self {
        let is_json = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let json = if is_json {
            serde_json::from_str(&body).ok()
        } else {
            None
        };

        Self {
            status,
            headers,
            body,
            json,
            response_time_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// 按名称读取响应头（不区分大小写）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
