use crate::variable::types::Environment;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

/// 变量替换器
///
/// 把文本中的 `{{name}}` 占位符替换为环境变量的字符串形式。
/// 按变量表的键做精确匹配，未定义的占位符保持原样。
pub struct VariableSubstitutor;

impl VariableSubstitutor {
    /// 替换文本中的所有 {{name}} 占位符
    ///
    /// 单趟扫描原文，变量值里携带的占位符不会被再次展开。
    pub fn substitute(text: &str, env: Option<&Environment>) -> String {
        let Some(env) = env else {
            return text.to_string();
        };

        static VAR_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = VAR_REGEX.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

        re.replace_all(text, |caps: &Captures| {
            env.get(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
    }

    /// 递归替换 JSON 结构中所有字符串叶子的变量
    ///
    /// 同时下探 map 和 list，非字符串叶子原样返回。
    pub fn substitute_value(data: &Value, env: Option<&Environment>) -> Value {
        match data {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::substitute_value(v, env)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| Self::substitute_value(item, env))
                    .collect(),
            ),
            Value::String(s) => Value::String(Self::substitute(s, env)),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env_with(pairs: &[(&str, &str)]) -> Environment {
        let mut env = Environment::new("test");
        for (k, v) in pairs {
            env.insert(*k, *v);
        }
        env
    }

    #[test]
    fn test_substitute_simple() {
        let env = env_with(&[("base_url", "http://localhost:8080")]);
        let output = VariableSubstitutor::substitute("{{base_url}}/api/users", Some(&env));
        assert_eq!(output, "http://localhost:8080/api/users");
    }

    #[test]
    fn test_substitute_multiple() {
        let env = env_with(&[("host", "example.com"), ("port", "8080")]);
        let output = VariableSubstitutor::substitute("https://{{host}}:{{port}}/api", Some(&env));
        assert_eq!(output, "https://example.com:8080/api");
    }

    #[test]
    fn test_substitute_missing_variable() {
        let env = env_with(&[]);
        // 未定义的变量保持原样
        let output = VariableSubstitutor::substitute("{{missing}}/path", Some(&env));
        assert_eq!(output, "{{missing}}/path");
    }

    #[test]
    fn test_substitute_no_environment() {
        let output = VariableSubstitutor::substitute("{{anything}}", None);
        assert_eq!(output, "{{anything}}");
    }

    #[test]
    fn test_substitute_structured_fallback() {
        let mut env = Environment::new("test");
        env.variables.insert(
            "x".to_string(),
            serde_json::from_value(json!({
                "currentValue": "",
                "initialValue": "fallback"
            }))
            .unwrap(),
        );

        assert_eq!(VariableSubstitutor::substitute("{{x}}", Some(&env)), "fallback");
    }

    #[test]
    fn test_value_carrying_placeholder_not_re_expanded() {
        // a 的值里带着 {{b}}，单趟替换后原样保留
        let env = env_with(&[("a", "{{b}}"), ("b", "x")]);
        assert_eq!(VariableSubstitutor::substitute("{{a}}", Some(&env)), "{{b}}");
        assert_eq!(
            VariableSubstitutor::substitute("{{a}}-{{b}}", Some(&env)),
            "{{b}}-x"
        );
    }

    #[test]
    fn test_substitute_value_recursive() {
        let env = env_with(&[("user_id", "42"), ("name", "tester")]);
        let body = json!({
            "id": "{{user_id}}",
            "nested": {"name": "{{name}}"},
            "list": ["{{user_id}}", 7, null],
            "count": 3
        });

        let resolved = VariableSubstitutor::substitute_value(&body, Some(&env));
        assert_eq!(
            resolved,
            json!({
                "id": "42",
                "nested": {"name": "tester"},
                "list": ["42", 7, null],
                "count": 3
            })
        );
    }

    #[test]
    fn test_substitute_plain_text_is_noop() {
        let env = env_with(&[("key", "value")]);
        let text = "no placeholders here";
        assert_eq!(VariableSubstitutor::substitute(text, Some(&env)), text);
    }
}
