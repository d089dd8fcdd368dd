use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;

/// 内置函数签名: 位置参数列表 -> 计算结果
///
/// 参数的类型推断由解析器完成，函数只按位置取值。
/// 返回值可以是标量，也可以是带 "result" 字段的复合对象
/// （解析器替换前会解开一层 "result"）。
pub type BuiltinFn = Box<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// 函数注册表
///
/// 显式构建的 name -> callable 映射，按引用注入解析器使用，
/// 不依赖任何全局状态。
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, BuiltinFn>,
}

impl FunctionRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带全部内置函数的注册表
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::expression::functions::register_builtins(&mut registry);
        registry
    }

    /// 注册一个函数（同名覆盖）
    pub fn register<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Box::new(func));
    }

    /// 查找函数
    pub fn get(&self, name: &str) -> Option<&BuiltinFn> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// 已注册的函数名（排序后，便于展示）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_call() {
        let mut registry = FunctionRegistry::new();
        registry.register("double", |args| {
            let n = args.first().and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(json!(n * 2))
        });

        assert!(registry.contains("double"));
        let func = registry.get("double").unwrap();
        assert_eq!(func(&[json!(21)]).unwrap(), json!(42));
    }

    #[test]
    fn test_unknown_function() {
        let registry = FunctionRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_builtins_present() {
        let registry = FunctionRegistry::with_builtins();
        for name in [
            "random_int",
            "random_uuid",
            "timestamp",
            "timestamp_sec",
            "md5",
            "base64_encode",
            "generate_bank_card",
            "validate_expression",
        ] {
            assert!(registry.contains(name), "missing builtin: {}", name);
        }
    }
}
