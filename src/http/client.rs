use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::http::response::ResponseCapture;
use crate::http::types::Method;
use crate::request::{BodyKind, ResolvedCall};
use crate::{Result, RusuiteError};

/// 请求超时，固定 30 秒，不做重试
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// 发送一个已完成变量替换与表达式解析的请求
    pub async fn execute(&self, call: &ResolvedCall) -> Result<ResponseCapture> {
        let url = if call.params.is_empty() {
            reqwest::Url::parse(&call.url)?
        } else {
            reqwest::Url::parse_with_params(&call.url, &call.params)?
        };

        let method = match call.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        };

        let mut headers = HeaderMap::new();
        for (key, value) in &call.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| RusuiteError::ParseError(format!("无效的请求头名称 {}: {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| RusuiteError::ParseError(format!("无效的请求头值 {}: {}", key, e)))?;
            headers.insert(name, value);
        }

        let mut req = self.inner.request(method, url).headers(headers);

        if let Some(body) = &call.body {
            req = match call.body_kind {
                BodyKind::Json => req.json(body),
                BodyKind::Form => {
                    let form: Vec<(String, String)> = body
                        .as_object()
                        .map(|map| {
                            map.iter()
                                .map(|(k, v)| (k.clone(), crate::variable::types::value_to_string(v)))
                                .collect()
                        })
                        .unwrap_or_default();
                    req.form(&form)
                }
                BodyKind::Raw => match body {
                    serde_json::Value::String(s) => req.body(s.clone()),
                    other => req.body(other.to_string()),
                },
                BodyKind::None => req,
            };
        }

        let start = Instant::now();
        let response = req.send().await?;
        let elapsed = start.elapsed();

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(ResponseCapture::new(status, headers, body, elapsed))
    }
}
