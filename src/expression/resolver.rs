use crate::expression::args::parse_args;
use crate::expression::registry::FunctionRegistry;
use crate::variable::types::value_to_string;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::warn;

/// 动态表达式解析器
///
/// 扫描文本中的 `${function_name(args)}` 占位符，在执行时计算动态值。
/// 占位符不支持嵌套（内层 `}` 即终止匹配），表达式是扁平的单层调用。
///
/// 任何失败（未知函数、参数错误、函数执行出错）都不会向调用方抛出:
/// 原始占位符保持不变，只记录一条 warning。
pub struct ExpressionResolver<'a> {
    registry: &'a FunctionRegistry,
}

impl<'a> ExpressionResolver<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self { registry }
    }

    /// 解析文本中的所有动态函数占位符
    pub fn resolve(&self, text: &str) -> String {
        static EXPR_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = EXPR_REGEX.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

        re.replace_all(text, |caps: &Captures| {
            let expression = &caps[1];
            match self.evaluate(expression) {
                Ok(value) => stringify_result(value),
                Err(e) => {
                    warn!("Expression resolution failed: ${{{}}} - {}", expression, e);
                    caps[0].to_string()
                }
            }
        })
        .to_string()
    }

    /// 递归解析 JSON 结构中所有字符串叶子的占位符
    pub fn resolve_value(&self, data: &Value) -> Value {
        match data {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve_value(v)))
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.resolve_value(item)).collect())
            }
            Value::String(s) => Value::String(self.resolve(s)),
            other => other.clone(),
        }
    }

    /// 评估单个表达式，如 "random_int(100, 200)" 或 "timestamp"
    fn evaluate(&self, expression: &str) -> anyhow::Result<Value> {
        static CALL_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = CALL_REGEX.get_or_init(|| Regex::new(r"^(\w+)\s*\((.*)\)\s*$").unwrap());

        let expression = expression.trim();
        let (func_name, args) = match re.captures(expression) {
            Some(caps) => {
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                (name.to_string(), parse_args(&caps[2]))
            }
            // 无括号的裸函数名也是合法形式: ${timestamp}
            None => (expression.to_string(), Vec::new()),
        };

        let func = self
            .registry
            .get(&func_name)
            .ok_or_else(|| anyhow::anyhow!("未知函数: {}", func_name))?;

        func(&args)
    }
}

/// 函数返回值转换为替换文本
///
/// 带 "result" 字段的复合对象先解开一层（只解一次），
/// 其余对象/数组按 JSON 序列化，标量直接取字符串形式。
fn stringify_result(value: Value) -> String {
    let unwrapped = match value {
        Value::Object(mut map) => match map.remove("result") {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    };
    value_to_string(&unwrapped)
}
