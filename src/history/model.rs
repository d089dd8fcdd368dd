use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::assertion::AssertionResult;

/// 历史记录条目
///
/// 每个被执行的步骤恰好写入一条，成功失败都写，只追加不修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// 唯一 ID (UUID)
    pub id: String,

    /// 请求名称
    pub request_name: String,

    /// 执行所用环境名，未指定环境时为 None
    pub environment: Option<String>,

    /// 解析完成后的请求快照（method/url/headers/params/body）
    pub request_data: Value,

    /// 响应快照，传输失败时为 None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// 耗时（毫秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default)]
    pub assertions_results: Vec<AssertionResult>,

    pub executed_by: String,

    pub executed_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(request_name: impl Into<String>, executed_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            request_name: request_name.into(),
            environment: None,
            request_data: Value::Null,
            response_data: None,
            status_code: None,
            response_time: None,
            error_message: None,
            assertions_results: Vec::new(),
            executed_by: executed_by.into(),
            executed_at: Utc::now(),
        }
    }
}
