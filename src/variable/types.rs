use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// 环境变量值
///
/// 支持两种形态:
/// - 普通标量: `"base_url": "http://localhost:8080"`
/// - 结构化值: `"token": {"currentValue": "abc", "initialValue": "def"}`
///
/// 结构化值优先取 currentValue，为空时回退到 initialValue。
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum VarValue {
    Structured {
        #[serde(rename = "currentValue", default)]
        current_value: Option<Value>,
        #[serde(rename = "initialValue", default)]
        initial_value: Option<Value>,
    },
    Scalar(Value),
}

impl<'de> Deserialize<'de> for VarValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        // 只有显式携带 currentValue/initialValue 的对象才是结构化变量，
        // 其余对象是普通标量
        if let Value::Object(map) = &value
            && (map.contains_key("currentValue") || map.contains_key("initialValue"))
        {
            return Ok(VarValue::Structured {
                current_value: map.get("currentValue").cloned(),
                initial_value: map.get("initialValue").cloned(),
            });
        }
        Ok(VarValue::Scalar(value))
    }
}

impl VarValue {
    /// 变量的替换用字符串形式
    pub fn resolved(&self) -> String {
        match self {
            VarValue::Structured {
                current_value,
                initial_value,
            } => {
                let current = current_value.as_ref().filter(|v| !is_empty_value(v));
                match current.or(initial_value.as_ref()) {
                    Some(v) => value_to_string(v),
                    None => String::new(),
                }
            }
            VarValue::Scalar(v) => value_to_string(v),
        }
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        VarValue::Scalar(Value::String(s.to_string()))
    }
}

impl From<String> for VarValue {
    fn from(s: String) -> Self {
        VarValue::Scalar(Value::String(s))
    }
}

/// 一个具名环境: name -> value 的扁平变量表
///
/// 引擎从不修改环境，单次执行最多提供一个环境。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub variables: HashMap<String, VarValue>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: HashMap::new(),
        }
    }

    /// 插入变量
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<VarValue>) {
        self.variables.insert(key.into(), value.into());
    }

    /// 获取变量的字符串形式
    pub fn get(&self, key: &str) -> Option<String> {
        self.variables.get(key).map(|v| v.resolved())
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// JSON 值转换为替换文本
///
/// 字符串不带引号，null 为空串，其余按 JSON 序列化输出。
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// 空串/null/false/0/空集合视为「无当前值」，回退到 initialValue
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_resolved() {
        let v = VarValue::Scalar(json!("hello"));
        assert_eq!(v.resolved(), "hello");

        let v = VarValue::Scalar(json!(42));
        assert_eq!(v.resolved(), "42");

        let v = VarValue::Scalar(Value::Null);
        assert_eq!(v.resolved(), "");
    }

    #[test]
    fn test_structured_prefers_current_value() {
        let v: VarValue = serde_json::from_value(json!({
            "currentValue": "now",
            "initialValue": "init"
        }))
        .unwrap();
        assert_eq!(v.resolved(), "now");
    }

    #[test]
    fn test_structured_falls_back_to_initial_value() {
        let v: VarValue = serde_json::from_value(json!({
            "currentValue": "",
            "initialValue": "fallback"
        }))
        .unwrap();
        assert_eq!(v.resolved(), "fallback");
    }

    #[test]
    fn test_structured_requires_marker_field() {
        // 不带 currentValue/initialValue 的对象是普通标量
        let v: VarValue = serde_json::from_value(json!({"foo": 1})).unwrap();
        assert!(matches!(v, VarValue::Scalar(_)));
        assert_eq!(v.resolved(), r#"{"foo":1}"#);

        let v: VarValue = serde_json::from_value(json!({"currentValue": null, "initialValue": "x"})).unwrap();
        assert!(matches!(v, VarValue::Structured { .. }));
        assert_eq!(v.resolved(), "x");
    }

    #[test]
    fn test_environment_get() {
        let mut env = Environment::new("dev");
        env.insert("base_url", "http://localhost:8080");

        assert_eq!(env.get("base_url"), Some("http://localhost:8080".into()));
        assert_eq!(env.get("missing"), None);
    }
}
