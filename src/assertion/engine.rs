//! 断言引擎
//!
//! 每条规则独立求值，任何内部失败都折叠为该条结果的
//! `passed=false` + `error`，绝不影响同组的其他规则。

use serde_json::Value;

use crate::assertion::types::{AssertionKind, AssertionResult, AssertionRule};
use crate::http::ResponseCapture;
use crate::variable::types::value_to_string;

/// contains 断言展示用的响应体截断长度
const DISPLAY_BODY_LIMIT: usize = 200;

pub fn evaluate(response: &ResponseCapture, rules: &[AssertionRule]) -> Vec<AssertionResult> {
    rules.iter().map(|rule| evaluate_rule(response, rule)).collect()
}

fn evaluate_rule(response: &ResponseCapture, rule: &AssertionRule) -> AssertionResult {
    let mut result = AssertionResult {
        name: rule.display_name(),
        kind: rule.kind,
        expected: rule.expected.clone(),
        actual: Value::Null,
        passed: false,
        error: None,
    };

    match rule.kind {
        AssertionKind::StatusCode => {
            result.actual = Value::from(response.status);
            match expected_as_i64(&rule.expected) {
                Some(expected) => result.passed = i64::from(response.status) == expected,
                None => result.error = Some(format!("期望状态码不是整数: {}", rule.expected)),
            }
        }
        AssertionKind::ResponseTime => match rule.actual_time {
            Some(actual) => {
                result.actual = Value::from(actual);
                match expected_as_f64(&rule.expected) {
                    Some(expected) => result.passed = actual <= expected,
                    None => result.error = Some(format!("期望耗时不是数字: {}", rule.expected)),
                }
            }
            None => {
                result.error = Some("缺少实测耗时，无法断言响应时间".to_string());
            }
        },
        AssertionKind::Contains => {
            result.actual = Value::String(truncate_for_display(&response.body));
            let needle = value_to_string(&rule.expected);
            // 匹配针对完整响应体，截断只影响展示
            result.passed = response.body.contains(&needle);
        }
        AssertionKind::JsonPath => evaluate_json_path(response, rule, &mut result),
        AssertionKind::Header => match rule.header_name.as_deref() {
            Some(name) if !name.is_empty() => {
                let actual = response.header(name);
                result.actual = actual.map(|v| Value::String(v.to_string())).unwrap_or(Value::Null);
                result.passed = actual == Some(value_to_string(&rule.expected).as_str());
            }
            _ => {
                result.error = Some("header 断言缺少 header_name".to_string());
            }
        },
        AssertionKind::Equals => {
            let actual = response.body.trim();
            result.actual = Value::String(actual.to_string());
            result.passed = actual == value_to_string(&rule.expected).trim();
        }
    }

    result
}

fn evaluate_json_path(response: &ResponseCapture, rule: &AssertionRule, result: &mut AssertionResult) {
    let Some(json) = &response.json else {
        result.error = Some("响应不是 JSON 格式，无法执行 json_path 断言".to_string());
        return;
    };
    let Some(path) = rule.json_path.as_deref().filter(|p| !p.trim().is_empty()) else {
        result.error = Some("json_path 断言缺少路径表达式".to_string());
        return;
    };

    match jsonpath_lib::select(json, path) {
        Ok(matches) => {
            let actual = matches.first().map(|v| (*v).clone()).unwrap_or(Value::Null);
            result.passed = value_to_string(&actual) == value_to_string(&rule.expected);
            result.actual = actual;
        }
        Err(e) => {
            result.error = Some(format!("json_path 查询失败: {}", e));
        }
    }
}

fn truncate_for_display(body: &str) -> String {
    if body.chars().count() <= DISPLAY_BODY_LIMIT {
        body.to_string()
    } else {
        let truncated: String = body.chars().take(DISPLAY_BODY_LIMIT).collect();
        format!("{}...", truncated)
    }
}

fn expected_as_i64(expected: &Value) -> Option<i64> {
    match expected {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn expected_as_f64(expected: &Value) -> Option<f64> {
    match expected {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
