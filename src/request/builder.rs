use std::collections::HashMap;

use serde_json::Value;

use crate::expression::{ExpressionResolver, FunctionRegistry};
use crate::http::Method;
use crate::request::types::{BodyKind, RequestDefinition};
use crate::variable::{Environment, VariableSubstitutor};
use crate::{Result, RusuiteError};

/// 完成占位符处理后的请求，可直接交给 http::Client 发送
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: HashMap<String, String>,
    pub body_kind: BodyKind,
    pub body: Option<Value>,
}

/// 请求构建器
///
/// 对 URL、启用的请求头、查询参数与请求体的字符串叶子
/// 先做 `{{var}}` 变量替换，再做 `${func(args)}` 表达式解析，
/// 各一轮，顺序固定。
pub struct RequestBuilder<'a> {
    registry: &'a FunctionRegistry,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self { registry }
    }

    pub fn build(
        &self,
        definition: &RequestDefinition,
        environment: Option<&Environment>,
    ) -> Result<ResolvedCall> {
        let resolver = ExpressionResolver::new(self.registry);
        let render =
            |text: &str| resolver.resolve(&VariableSubstitutor::substitute(text, environment));

        let url = render(&definition.url);
        // 必须是带协议的绝对地址
        url::Url::parse(&url).map_err(|_| RusuiteError::InvalidUrl(url.clone()))?;

        let headers: Vec<(String, String)> = definition
            .headers
            .enabled_pairs()
            .into_iter()
            .map(|(key, value)| (key, render(&value)))
            .collect();

        let params: HashMap<String, String> = definition
            .params
            .iter()
            .map(|(key, value)| (key.clone(), render(value)))
            .collect();

        // 请求体只对允许携带 body 的方法生效
        let (body_kind, body) = if definition.method.allows_body()
            && definition.body.kind != BodyKind::None
        {
            let substituted = VariableSubstitutor::substitute_value(&definition.body.data, environment);
            let resolved = resolver.resolve_value(&substituted);
            (definition.body.kind, Some(resolved))
        } else {
            (BodyKind::None, None)
        };

        Ok(ResolvedCall {
            method: definition.method,
            url,
            headers,
            params,
            body_kind,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::types::{BodySpec, HeaderEntry, HeaderSpec};
    use crate::variable::types::VarValue;
    use serde_json::json;

    fn environment() -> Environment {
        let mut variables = HashMap::new();
        variables.insert("base_url".to_string(), VarValue::Scalar(json!("http://localhost:9000")));
        variables.insert("token".to_string(), VarValue::Scalar(json!("abc123")));
        Environment {
            name: "dev".to_string(),
            variables,
        }
    }

    fn registry() -> FunctionRegistry {
        FunctionRegistry::with_builtins()
    }

    fn minimal_definition(method: Method, url: &str) -> RequestDefinition {
        RequestDefinition {
            name: "test".to_string(),
            method,
            url: url.to_string(),
            headers: HeaderSpec::default(),
            params: HashMap::new(),
            body: BodySpec::default(),
            assertions: Vec::new(),
            order: 0,
        }
    }

    #[test]
    fn test_url_substitution_and_validation() {
        let registry = registry();
        let builder = RequestBuilder::new(&registry);
        let definition = minimal_definition(Method::Get, "{{base_url}}/api/users");

        let call = builder.build(&definition, Some(&environment())).unwrap();
        assert_eq!(call.url, "http://localhost:9000/api/users");
    }

    #[test]
    fn test_relative_url_rejected() {
        let registry = registry();
        let builder = RequestBuilder::new(&registry);
        let definition = minimal_definition(Method::Get, "/api/users");

        assert!(matches!(
            builder.build(&definition, None),
            Err(RusuiteError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_disabled_headers_excluded() {
        let registry = registry();
        let builder = RequestBuilder::new(&registry);
        let mut definition = minimal_definition(Method::Get, "http://localhost/x");
        definition.headers = HeaderSpec::List(vec![
            HeaderEntry {
                key: "Authorization".to_string(),
                value: "Bearer {{token}}".to_string(),
                enabled: true,
            },
            HeaderEntry {
                key: "X-Debug".to_string(),
                value: "1".to_string(),
                enabled: false,
            },
        ]);

        let call = builder.build(&definition, Some(&environment())).unwrap();
        assert_eq!(call.headers, vec![("Authorization".to_string(), "Bearer abc123".to_string())]);
    }

    #[test]
    fn test_body_only_for_mutating_methods() {
        let registry = registry();
        let builder = RequestBuilder::new(&registry);

        let mut get_def = minimal_definition(Method::Get, "http://localhost/x");
        get_def.body = BodySpec {
            kind: BodyKind::Json,
            data: json!({"a": 1}),
        };
        let call = builder.build(&get_def, None).unwrap();
        assert_eq!(call.body_kind, BodyKind::None);
        assert!(call.body.is_none());

        let mut post_def = minimal_definition(Method::Post, "http://localhost/x");
        post_def.body = BodySpec {
            kind: BodyKind::Json,
            data: json!({"token": "{{token}}", "code": "${random_digits(4)}"}),
        };
        let call = builder.build(&post_def, Some(&environment())).unwrap();
        assert_eq!(call.body_kind, BodyKind::Json);
        let body = call.body.unwrap();
        assert_eq!(body["token"], json!("abc123"));
        assert_eq!(body["code"].as_str().unwrap().len(), 4);
    }

    #[test]
    fn test_params_resolved() {
        let registry = registry();
        let builder = RequestBuilder::new(&registry);
        let mut definition = minimal_definition(Method::Get, "http://localhost/x");
        definition.params.insert("token".to_string(), "{{token}}".to_string());

        let call = builder.build(&definition, Some(&environment())).unwrap();
        assert_eq!(call.params.get("token"), Some(&"abc123".to_string()));
    }

    #[test]
    fn test_unknown_variable_left_untouched() {
        let registry = registry();
        let builder = RequestBuilder::new(&registry);
        let definition = minimal_definition(Method::Get, "http://localhost/{{missing}}");

        let call = builder.build(&definition, Some(&environment())).unwrap();
        assert_eq!(call.url, "http://localhost/{{missing}}");
    }
}
