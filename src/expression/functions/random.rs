//! 随机数据生成函数
//!
//! count 为 1 时结果是标量，大于 1 时是 `{result: [...], count: n}` 列表。

use anyhow::{Result, bail};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::expression::args::{arg_f64, arg_i64, arg_str, arg_usize};
use crate::expression::registry::FunctionRegistry;

const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const PUNCTUATION: &str = r##"!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~"##;
const HEX_LOWER: &str = "0123456789abcdef";
const CHINESE_COMMON: &str = "的一是在不了有和人这中大为上个国我以要他时来用们生到作地于出就分对成会可主发年动同工也能下过子说产种面而方后多定行学法所民得经十三之进着等部度家电力里如水化高自二理起小物现实量都两体制机当使点从业本去把性好应开";

pub fn register(registry: &mut FunctionRegistry) {
    registry.register("random_int", random_int);
    registry.register("random_float", random_float);
    registry.register("random_string", random_string);
    registry.register("random_digits", random_digits);
    registry.register("random_letters", random_letters);
    registry.register("random_chinese", random_chinese);
    registry.register("random_uuid", random_uuid);
    registry.register("random_guid", random_uuid);
    registry.register("random_mac", random_mac);
    registry.register("random_mac_address", random_mac);
    registry.register("random_ip", random_ip);
    registry.register("random_ip_address", random_ip);
    registry.register("random_date", random_date);
    registry.register("random_boolean", random_boolean);
    registry.register("random_color", random_color);
    registry.register("random_password", random_password);
    registry.register("random_sequence", random_sequence);
}

/// count == 1 返回标量，否则返回带 count 的列表
fn repeated(count: usize, mut generate: impl FnMut() -> Result<Value>) -> Result<Value> {
    if count == 1 {
        Ok(json!({ "result": generate()? }))
    } else {
        let items = (0..count).map(|_| generate()).collect::<Result<Vec<_>>>()?;
        Ok(json!({ "result": items, "count": items.len() }))
    }
}

fn pick_chars(charset: &str, length: usize) -> String {
    let chars: Vec<char> = charset.chars().collect();
    let mut rng = rand::rng();
    (0..length)
        .map(|_| chars[rng.random_range(0..chars.len())])
        .collect()
}

/// random_int(min=0, max=100, count=1)
fn random_int(args: &[Value]) -> Result<Value> {
    let min = arg_i64(args, 0, 0);
    let max = arg_i64(args, 1, 100);
    let count = arg_usize(args, 2, 1);
    if min > max {
        bail!("随机数生成失败: 下界 {} 大于上界 {}", min, max);
    }
    repeated(count, || Ok(json!(rand::rng().random_range(min..=max))))
}

/// random_float(min=0.0, max=1.0, precision=2, count=1)
fn random_float(args: &[Value]) -> Result<Value> {
    let min = arg_f64(args, 0, 0.0);
    let max = arg_f64(args, 1, 1.0);
    let precision = arg_usize(args, 2, 2).min(15);
    let count = arg_usize(args, 3, 1);
    if min > max {
        bail!("随机浮点数生成失败: 下界 {} 大于上界 {}", min, max);
    }
    repeated(count, || {
        let v = rand::rng().random_range(min..=max);
        let rounded: f64 = format!("{:.*}", precision, v).parse()?;
        Ok(json!(rounded))
    })
}

/// random_string(length=8, char_type='all', count=1)
fn random_string(args: &[Value]) -> Result<Value> {
    let length = arg_usize(args, 0, 8);
    let char_type = arg_str(args, 1, "all");
    let count = arg_usize(args, 2, 1);

    let all;
    let alphanumeric;
    let letters;
    let charset: &str = match char_type.as_str() {
        "all" => {
            all = format!("{}{}{}{}", LOWERCASE, UPPERCASE, DIGITS, PUNCTUATION);
            &all
        }
        "letters" => {
            letters = format!("{}{}", LOWERCASE, UPPERCASE);
            &letters
        }
        "lowercase" => LOWERCASE,
        "uppercase" => UPPERCASE,
        "digits" => DIGITS,
        "alphanumeric" => {
            alphanumeric = format!("{}{}{}", LOWERCASE, UPPERCASE, DIGITS);
            &alphanumeric
        }
        "hex" => HEX_LOWER,
        "chinese" => CHINESE_COMMON,
        "special" => PUNCTUATION,
        other => bail!("不支持的字符类型: {}", other),
    };

    repeated(count, || Ok(json!(pick_chars(charset, length))))
}

/// random_digits(length=6, count=1)
fn random_digits(args: &[Value]) -> Result<Value> {
    let length = arg_usize(args, 0, 6);
    let count = arg_usize(args, 1, 1);
    repeated(count, || Ok(json!(pick_chars(DIGITS, length))))
}

/// random_letters(length=8, count=1)
fn random_letters(args: &[Value]) -> Result<Value> {
    let length = arg_usize(args, 0, 8);
    let count = arg_usize(args, 1, 1);
    let letters = format!("{}{}", LOWERCASE, UPPERCASE);
    repeated(count, || Ok(json!(pick_chars(&letters, length))))
}

/// random_chinese(length=2, count=1)
fn random_chinese(args: &[Value]) -> Result<Value> {
    let length = arg_usize(args, 0, 2);
    let count = arg_usize(args, 1, 1);
    repeated(count, || Ok(json!(pick_chars(CHINESE_COMMON, length))))
}

/// random_uuid(version=4, count=1)
fn random_uuid(args: &[Value]) -> Result<Value> {
    let version = arg_i64(args, 0, 4);
    let count = arg_usize(args, 1, 1);
    if version != 4 {
        bail!("不支持的UUID版本: {}", version);
    }
    repeated(count, || Ok(json!(Uuid::new_v4().to_string())))
}

/// random_mac(separator=':', count=1)
fn random_mac(args: &[Value]) -> Result<Value> {
    let separator = arg_str(args, 0, ":");
    let count = arg_usize(args, 1, 1);
    repeated(count, || {
        let mut rng = rand::rng();
        let mut parts: Vec<String> = (0..6)
            .map(|_| format!("{:02x}", rng.random_range(0x00..=0xffu32)))
            .collect();
        // 第一字节最低位清零，保证是单播地址
        let first = u32::from_str_radix(&parts[0], 16)? & 0xfe;
        parts[0] = format!("{:02x}", first);
        Ok(json!(parts.join(&separator)))
    })
}

/// random_ip(version=4, count=1)
fn random_ip(args: &[Value]) -> Result<Value> {
    let version = arg_i64(args, 0, 4);
    let count = arg_usize(args, 1, 1);
    match version {
        4 => repeated(count, || {
            let mut rng = rand::rng();
            let octets: Vec<String> = (0..4)
                .map(|_| rng.random_range(0..=255u32).to_string())
                .collect();
            Ok(json!(octets.join(".")))
        }),
        6 => repeated(count, || {
            let mut rng = rand::rng();
            let groups: Vec<String> = (0..8)
                .map(|_| format!("{:04x}", rng.random_range(0..=0xffffu32)))
                .collect();
            Ok(json!(groups.join(":")))
        }),
        other => bail!("不支持的IP版本: {}", other),
    }
}

/// random_date(start='2024-01-01', end='2024-12-31', count=1, format='%Y-%m-%d')
fn random_date(args: &[Value]) -> Result<Value> {
    let start = arg_str(args, 0, "2024-01-01");
    let end = arg_str(args, 1, "2024-12-31");
    let count = arg_usize(args, 2, 1);
    let fmt = arg_str(args, 3, "%Y-%m-%d");

    let start_dt = parse_date(&start)?;
    let end_dt = parse_date(&end)?;
    let delta = (end_dt - start_dt).num_seconds();
    if delta < 0 {
        bail!("随机日期生成失败: 起始日期晚于结束日期");
    }

    repeated(count, || {
        let offset = rand::rng().random_range(0..=delta);
        let dt = start_dt + Duration::seconds(offset);
        Ok(json!(super::datetime::format_naive(dt, &fmt)?))
    })
}

fn parse_date(s: &str) -> Result<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// random_boolean(count=1)
fn random_boolean(args: &[Value]) -> Result<Value> {
    let count = arg_usize(args, 0, 1);
    repeated(count, || Ok(json!(rand::rng().random::<bool>())))
}

/// random_color(format='hex', count=1)
fn random_color(args: &[Value]) -> Result<Value> {
    let format = arg_str(args, 0, "hex");
    let count = arg_usize(args, 1, 1);
    repeated(count, || {
        let mut rng = rand::rng();
        let (r, g, b) = (
            rng.random_range(0..=255u32),
            rng.random_range(0..=255u32),
            rng.random_range(0..=255u32),
        );
        let color = match format.as_str() {
            "hex" => format!("#{:02x}{:02x}{:02x}", r, g, b),
            "rgb" => format!("rgb({}, {}, {})", r, g, b),
            "rgba" => {
                let a: f64 = format!("{:.2}", rng.random_range(0.0..1.0)).parse()?;
                format!("rgba({}, {}, {}, {})", r, g, b, a)
            }
            other => bail!("不支持的格式: {}", other),
        };
        Ok(json!(color))
    })
}

/// random_password(length=12, count=1)，混合大小写字母、数字与特殊字符
fn random_password(args: &[Value]) -> Result<Value> {
    let length = arg_usize(args, 0, 12);
    let count = arg_usize(args, 1, 1);
    let charset = format!("{}{}{}{}", UPPERCASE, LOWERCASE, DIGITS, "!@#$%^&*()_+-=[]{}|;:,.<>?");
    repeated(count, || Ok(json!(pick_chars(&charset, length))))
}

/// random_sequence(sequence, count=1, unique=false)
fn random_sequence(args: &[Value]) -> Result<Value> {
    let sequence: Vec<Value> = match args.first() {
        Some(Value::Array(items)) => items.clone(),
        // 逗号分隔的裸序列: a,b,c
        Some(Value::String(s)) => s
            .split(',')
            .map(|item| json!(item.trim().trim_matches(|c| c == '\'' || c == '"')))
            .collect(),
        _ => bail!("随机序列选择失败, 请检查参数!"),
    };
    if sequence.is_empty() {
        bail!("随机序列选择失败, 请检查参数!");
    }

    let count = arg_usize(args, 1, 1);
    let unique = crate::expression::args::arg_bool(args, 2, false);

    let mut rng = rand::rng();
    let picked: Vec<Value> = if unique {
        if count > sequence.len() {
            bail!("请求数量({})大于序列长度({})", count, sequence.len());
        }
        let mut shuffled = sequence.clone();
        shuffled.shuffle(&mut rng);
        shuffled.truncate(count);
        shuffled
    } else {
        (0..count)
            .map(|_| sequence[rng.random_range(0..sequence.len())].clone())
            .collect()
    };

    if count == 1 {
        Ok(json!({ "result": picked[0], "count": 1 }))
    } else {
        Ok(json!({ "result": picked, "count": picked.len() }))
    }
}
