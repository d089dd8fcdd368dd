//! 时间日期函数
//!
//! `timestamp` / `timestamp_sec` 产生毫秒/秒级时间戳，
//! `datetime` / `date` / `time` / `date_offset` 按 strftime 风格格式化当前时间。

use anyhow::{Result, bail};
use chrono::{DateTime, Duration, Local};
use serde_json::{Value, json};

use crate::expression::args::{arg_i64, arg_str};
use crate::expression::registry::FunctionRegistry;

pub fn register(registry: &mut FunctionRegistry) {
    registry.register("timestamp", timestamp);
    registry.register("timestamp_sec", timestamp_sec);
    registry.register("datetime", now_datetime);
    registry.register("date", now_date);
    registry.register("time", now_time);
    registry.register("date_offset", date_offset);
}

/// 格式串无效时 chrono 的 DelayedFormat 在 Display 阶段才报错，
/// 这里先展开并检查，避免 to_string 时 panic
fn format_local(dt: DateTime<Local>, fmt: &str) -> Result<String> {
    use chrono::format::{Item, StrftimeItems};

    let items: Vec<Item> = StrftimeItems::new(fmt).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        bail!("无效的时间格式: {}", fmt);
    }
    Ok(dt.format_with_items(items.into_iter()).to_string())
}

pub(super) fn format_naive(dt: chrono::NaiveDateTime, fmt: &str) -> Result<String> {
    use chrono::format::{Item, StrftimeItems};

    let items: Vec<Item> = StrftimeItems::new(fmt).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        bail!("无效的时间格式: {}", fmt);
    }
    Ok(dt.format_with_items(items.into_iter()).to_string())
}

/// 当前时间戳（毫秒）
fn timestamp(_args: &[Value]) -> Result<Value> {
    Ok(json!(Local::now().timestamp_millis()))
}

/// 当前时间戳（秒）
fn timestamp_sec(_args: &[Value]) -> Result<Value> {
    Ok(json!(Local::now().timestamp()))
}

fn now_datetime(args: &[Value]) -> Result<Value> {
    let fmt = arg_str(args, 0, "%Y-%m-%d %H:%M:%S");
    Ok(json!(format_local(Local::now(), &fmt)?))
}

fn now_date(args: &[Value]) -> Result<Value> {
    let fmt = arg_str(args, 0, "%Y-%m-%d");
    Ok(json!(format_local(Local::now(), &fmt)?))
}

fn now_time(args: &[Value]) -> Result<Value> {
    let fmt = arg_str(args, 0, "%H:%M:%S");
    Ok(json!(format_local(Local::now(), &fmt)?))
}

/// 偏移后的日期时间: date_offset(days, hours, minutes, format)
fn date_offset(args: &[Value]) -> Result<Value> {
    let days = arg_i64(args, 0, 0);
    let hours = arg_i64(args, 1, 0);
    let minutes = arg_i64(args, 2, 0);
    let fmt = arg_str(args, 3, "%Y-%m-%d %H:%M:%S");

    let dt = Local::now() + Duration::days(days) + Duration::hours(hours) + Duration::minutes(minutes);
    Ok(json!(format_local(dt, &fmt)?))
}
