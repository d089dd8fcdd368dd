//! Crontab 表达式函数
//!
//! 操作标准的 5 字段表达式（分 时 日 月 周）。
//! 下次执行时间的推算交给 cron crate，它要求带秒字段，
//! 因此求值前统一补上秒位 "0"。

use anyhow::{Result, bail};
use chrono::Local;
use cron::Schedule;
use serde_json::{Value, json};
use std::str::FromStr;

use crate::expression::args::{arg_str, arg_usize};
use crate::expression::registry::FunctionRegistry;

pub fn register(registry: &mut FunctionRegistry) {
    registry.register("generate_expression", generate_expression);
    registry.register("parse_expression", parse_expression);
    registry.register("get_next_runs", get_next_runs);
    registry.register("validate_expression", validate_expression);
}

/// generate_expression(minute='*', hour='*', day='*', month='*', weekday='*')
fn generate_expression(args: &[Value]) -> Result<Value> {
    let minute = arg_str(args, 0, "*");
    let hour = arg_str(args, 1, "*");
    let day = arg_str(args, 2, "*");
    let month = arg_str(args, 3, "*");
    let weekday = arg_str(args, 4, "*");

    let expression = format!("{} {} {} {} {}", minute, hour, day, month, weekday);
    Ok(json!({
        "result": expression,
        "minute": minute,
        "hour": hour,
        "day": day,
        "month": month,
        "weekday": weekday,
    }))
}

fn split_fields(expression: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = expression.split_whitespace().collect();
    if parts.len() != 5 {
        bail!("Crontab表达式格式错误，必须包含5个字段");
    }
    Ok(parts)
}

fn parse_expression(args: &[Value]) -> Result<Value> {
    let expression = arg_str(args, 0, "* * * * *");
    let parts = split_fields(&expression)?;
    Ok(json!({
        "success": true,
        "minute": parts[0],
        "hour": parts[1],
        "day": parts[2],
        "month": parts[3],
        "weekday": parts[4],
    }))
}

/// 星期字段翻译
///
/// 对外约定 0-6、0 是周日；cron crate 按 1=周日编号，
/// 数字直接透传会整体偏移一天，因此映射成星期名。
/// 步长（/ 后面的数字）不是星期，保持原样。
fn translate_weekday(field: &str) -> String {
    const NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

    let mut out = String::with_capacity(field.len() + 8);
    let mut digits = String::new();
    let mut in_step = false;

    let flush = |out: &mut String, digits: &mut String, as_day: bool| {
        if digits.is_empty() {
            return;
        }
        match digits.parse::<usize>() {
            Ok(n) if as_day && n <= 6 => out.push_str(NAMES[n]),
            _ => out.push_str(digits),
        }
        digits.clear();
    };

    for c in field.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        flush(&mut out, &mut digits, !in_step);
        match c {
            '/' => in_step = true,
            ',' => in_step = false,
            _ => {}
        }
        out.push(c);
    }
    flush(&mut out, &mut digits, !in_step);
    out
}

/// get_next_runs(expression='* * * * *', count=5)
fn get_next_runs(args: &[Value]) -> Result<Value> {
    let expression = arg_str(args, 0, "* * * * *");
    let count = arg_usize(args, 1, 5);
    let parts = split_fields(&expression)?;

    // cron crate 的表达式以秒字段开头
    let normalized = format!(
        "0 {} {} {} {} {}",
        parts[0],
        parts[1],
        parts[2],
        parts[3],
        translate_weekday(parts[4])
    );
    let schedule = Schedule::from_str(&normalized)
        .map_err(|e| anyhow::anyhow!("获取下次执行时间失败: {}", e))?;

    let next_runs: Vec<String> = schedule
        .upcoming(Local)
        .take(count)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .collect();

    Ok(json!({
        "result": next_runs,
        "expression": expression,
        "count": next_runs.len(),
    }))
}

/// 单字段校验，支持 * 、列表、范围与步长
fn validate_field(field: &str, min: u32, max: u32) -> bool {
    if field == "*" {
        return true;
    }

    let in_range = |raw: &str| raw.parse::<u32>().is_ok_and(|v| (min..=max).contains(&v));

    field.split(',').all(|part| {
        if let Some((base, step)) = part.split_once('/') {
            if step.parse::<u32>().is_err() {
                return false;
            }
            base == "*" || in_range(base)
        } else if let Some((start, end)) = part.split_once('-') {
            in_range(start) && in_range(end)
        } else {
            in_range(part)
        }
    })
}

fn validate_expression(args: &[Value]) -> Result<Value> {
    let expression = arg_str(args, 0, "* * * * *");

    let invalid = |error: &str| {
        json!({
            "success": false,
            "valid": false,
            "error": error,
        })
    };

    let parts: Vec<&str> = expression.split_whitespace().collect();
    if parts.len() != 5 {
        return Ok(invalid("Crontab表达式格式错误，必须包含5个字段"));
    }

    let checks: [(&str, u32, u32, &str); 5] = [
        (parts[0], 0, 59, "分钟字段值无效，范围应为0-59"),
        (parts[1], 0, 23, "小时字段值无效，范围应为0-23"),
        (parts[2], 1, 31, "日字段值无效，范围应为1-31"),
        (parts[3], 1, 12, "月字段值无效，范围应为1-12"),
        (parts[4], 0, 6, "星期字段值无效，范围应为0-6（0是周日）"),
    ];
    for (field, min, max, error) in checks {
        if !validate_field(field, min, max) {
            return Ok(invalid(error));
        }
    }

    Ok(json!({
        "success": true,
        "valid": true,
        "message": "Crontab表达式格式正确",
    }))
}
