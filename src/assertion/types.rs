use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 断言类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionKind {
    StatusCode,
    ResponseTime,
    Contains,
    JsonPath,
    Header,
    Equals,
}

impl AssertionKind {
    pub fn as_str(&self) -> &str {
        match self {
            AssertionKind::StatusCode => "status_code",
            AssertionKind::ResponseTime => "response_time",
            AssertionKind::Contains => "contains",
            AssertionKind::JsonPath => "json_path",
            AssertionKind::Header => "header",
            AssertionKind::Equals => "equals",
        }
    }
}

/// 一条声明式断言规则
///
/// `actual_time` 不是规则配置: response_time 断言所需的实测耗时
/// 由调用方在求值前注入，引擎本身不计时也不改写规则。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: AssertionKind,
    #[serde(default)]
    pub expected: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub actual_time: Option<f64>,
}

impl AssertionRule {
    pub fn new(kind: AssertionKind, expected: Value) -> Self {
        Self {
            name: None,
            kind,
            expected,
            json_path: None,
            header_name: None,
            actual_time: None,
        }
    }

    /// 注入实测耗时（毫秒），供 response_time 断言使用
    pub fn with_actual_time(mut self, elapsed_ms: f64) -> Self {
        self.actual_time = Some(elapsed_ms);
        self
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.kind.as_str().to_string())
    }
}

/// 每条规则恰好产生一行结果，内部失败也不例外
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionResult {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssertionKind,
    pub expected: Value,
    pub actual: Value,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_deserialization() {
        let rule: AssertionRule = serde_json::from_value(json!({
            "type": "json_path",
            "expected": "42",
            "json_path": "$.data.id"
        }))
        .unwrap();
        assert_eq!(rule.kind, AssertionKind::JsonPath);
        assert_eq!(rule.json_path.as_deref(), Some("$.data.id"));
        assert!(rule.actual_time.is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_kind() {
        let rule = AssertionRule::new(AssertionKind::StatusCode, json!(200));
        assert_eq!(rule.display_name(), "status_code");

        let named = AssertionRule {
            name: Some("状态码检查".to_string()),
            ..rule
        };
        assert_eq!(named.display_name(), "状态码检查");
    }

    #[test]
    fn test_actual_time_not_serialized() {
        let rule = AssertionRule::new(AssertionKind::ResponseTime, json!(500)).with_actual_time(120.0);
        let serialized = serde_json::to_value(&rule).unwrap();
        assert!(serialized.get("actual_time").is_none());
    }
}
