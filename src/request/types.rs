use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assertion::AssertionRule;
use crate::http::Method;

/// 一个待执行的请求定义
///
/// 通常由外部 JSON 反序列化而来，URL、请求头、参数与请求体中
/// 都可以出现 `{{var}}` 与 `${func(args)}` 占位符。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDefinition {
    pub name: String,
    pub method: Method,
    pub url: String,
    #[serde(default)]
    pub headers: HeaderSpec,
    #[serde(default)]
    pub params: HashMap<String, String>,
    #[serde(default)]
    pub body: BodySpec,
    #[serde(default)]
    pub assertions: Vec<AssertionRule>,
    #[serde(default)]
    pub order: i64,
}

/// 请求头既支持带启用标记的列表形式，也支持简单映射形式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderSpec {
    List(Vec<HeaderEntry>),
    Map(HashMap<String, String>),
}

impl Default for HeaderSpec {
    fn default() -> Self {
        HeaderSpec::List(Vec::new())
    }
}

impl HeaderSpec {
    /// 展开为 (key, value) 对，列表形式只保留 enabled 的条目
    pub fn enabled_pairs(&self) -> Vec<(String, String)> {
        match self {
            HeaderSpec::List(entries) => entries
                .iter()
                .filter(|e| e.enabled)
                .map(|e| (e.key.clone(), e.value.clone()))
                .collect(),
            HeaderSpec::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodySpec {
    #[serde(rename = "type", default)]
    pub kind: BodyKind,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    #[default]
    None,
    Json,
    Raw,
    Form,
}
