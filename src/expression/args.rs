use serde_json::Value;

/// 解析函数参数串
///
/// 单次从左到右的字符扫描:
/// - `[...]` 内的逗号不分隔（列表字面量）
/// - 单/双引号内的逗号不分隔
/// - 顶层逗号作为参数分隔符
///
/// 引号或括号不配对时不报错，扫描到串尾自然结束。
pub fn parse_args(args_str: &str) -> Vec<Value> {
    if args_str.trim().is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut quote_char: Option<char> = None;

    for ch in args_str.chars() {
        match ch {
            '[' if quote_char.is_none() => {
                in_brackets = true;
                current.push(ch);
            }
            ']' if quote_char.is_none() => {
                in_brackets = false;
                current.push(ch);
            }
            '"' | '\'' => {
                match quote_char {
                    None => quote_char = Some(ch),
                    Some(q) if q == ch => quote_char = None,
                    _ => {}
                }
                current.push(ch);
            }
            ',' if !in_brackets && quote_char.is_none() => {
                args.push(coerce_arg(current.trim()));
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        args.push(coerce_arg(current.trim()));
    }

    args
}

/// 单个原始参数的类型推断
///
/// 依次尝试: 布尔 -> 数字(含 '.' 按浮点) -> JSON 列表 -> 去引号字符串
pub fn coerce_arg(arg: &str) -> Value {
    if arg.is_empty() {
        return Value::Null;
    }

    if arg.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if arg.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if arg.contains('.') {
        if let Ok(f) = arg.parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    } else if let Ok(i) = arg.parse::<i64>() {
        return Value::Number(i.into());
    }

    if arg.starts_with('[') && arg.ends_with(']') {
        if let Ok(v @ Value::Array(_)) = serde_json::from_str::<Value>(arg) {
            return v;
        }
    }

    Value::String(arg.trim_matches(|c| c == '\'' || c == '"').to_string())
}

// ---- 内置函数取参辅助 ----
// 参数统一由解析器做类型推断，函数侧按位置取值并给出默认值。

pub(crate) fn arg_i64(args: &[Value], idx: usize, default: i64) -> i64 {
    args.get(idx).and_then(value_as_i64).unwrap_or(default)
}

pub(crate) fn arg_f64(args: &[Value], idx: usize, default: f64) -> f64 {
    args.get(idx).and_then(value_as_f64).unwrap_or(default)
}

pub(crate) fn arg_usize(args: &[Value], idx: usize, default: usize) -> usize {
    let v = arg_i64(args, idx, default as i64);
    if v < 1 { default } else { v as usize }
}

pub(crate) fn arg_bool(args: &[Value], idx: usize, default: bool) -> bool {
    match args.get(idx) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => default,
    }
}

pub(crate) fn arg_str(args: &[Value], idx: usize, default: &str) -> String {
    match args.get(idx) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => default.to_string(),
        Some(other) => crate::variable::types::value_to_string(other),
    }
}

fn value_as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_empty() {
        assert!(parse_args("").is_empty());
        assert!(parse_args("   ").is_empty());
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_args("100, 200"), vec![json!(100), json!(200)]);
        assert_eq!(parse_args("1.5, 2"), vec![json!(1.5), json!(2)]);
    }

    #[test]
    fn test_parse_booleans() {
        assert_eq!(parse_args("true, FALSE"), vec![json!(true), json!(false)]);
    }

    #[test]
    fn test_parse_quoted_strings() {
        assert_eq!(
            parse_args(r#""hello, world", 'x'"#),
            vec![json!("hello, world"), json!("x")]
        );
    }

    #[test]
    fn test_parse_list_literal() {
        assert_eq!(
            parse_args(r#"["a","b","c"], 2"#),
            vec![json!(["a", "b", "c"]), json!(2)]
        );
    }

    #[test]
    fn test_parse_bare_string() {
        assert_eq!(parse_args("%Y-%m-%d"), vec![json!("%Y-%m-%d")]);
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(parse_args("  5 ,  abc  "), vec![json!(5), json!("abc")]);
    }

    #[test]
    fn test_unterminated_quote_does_not_panic() {
        // 引号不配对时扫描到串尾结束，结果仍然是单个参数
        let args = parse_args(r#""unterminated, arg"#);
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_malformed_list_kept_literal() {
        // 未闭合的方括号吞掉其后的逗号，整体保留为一个参数
        assert_eq!(parse_args("[1, 2"), vec![json!("[1, 2")]);
        assert_eq!(parse_args("[not json]"), vec![json!("[not json]")]);
    }
}
