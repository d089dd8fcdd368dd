//! 编码转换函数
//!
//! Base64、URL 编码、Unicode/ASCII 转换、进制与颜色转换、
//! 时间戳互转，以及条形码/二维码的文本渲染。

use anyhow::{Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Local, NaiveDateTime, TimeZone};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde_json::{Value, json};

use crate::expression::args::{arg_i64, arg_str};
use crate::expression::registry::FunctionRegistry;

// 与常见 URL 编码保持一致: 字母数字与 _ . - ~ 不转义
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

pub fn register(registry: &mut FunctionRegistry) {
    registry.register("timestamp_convert", timestamp_convert);
    registry.register("base64_encode", base64_encode);
    registry.register("base64_decode", base64_decode);
    registry.register("url_encode", url_encode);
    registry.register("url_decode", url_decode);
    registry.register("unicode_convert", unicode_convert);
    registry.register("ascii_convert", ascii_convert);
    registry.register("color_convert", color_convert);
    registry.register("base_convert", base_convert);
    registry.register("generate_barcode", generate_barcode);
    registry.register("generate_qrcode", generate_qrcode);
}

/// timestamp_convert(timestamp, convert_type='to_datetime')
///
/// to_datetime 时自动识别单位: 大于 10^11 按毫秒处理。
fn timestamp_convert(args: &[Value]) -> Result<Value> {
    let convert_type = arg_str(args, 1, "to_datetime");

    match convert_type.as_str() {
        "to_datetime" => {
            let raw = arg_str(args, 0, "");
            let mut ts: f64 = raw.trim().parse().map_err(|_| anyhow::anyhow!("时间戳转换失败: {}", raw))?;
            let unit = if ts > 1e11 {
                ts /= 1000.0;
                "millisecond"
            } else {
                "second"
            };

            let secs = ts.trunc() as i64;
            let nanos = (ts.fract() * 1e9) as u32;
            let dt = Local
                .timestamp_opt(secs, nanos)
                .single()
                .ok_or_else(|| anyhow::anyhow!("时间戳转换失败: {}", raw))?;

            Ok(json!({
                "result": dt.format("%Y-%m-%d %H:%M:%S").to_string(),
                "iso_format": dt.to_rfc3339(),
                "date": dt.format("%Y-%m-%d").to_string(),
                "time": dt.format("%H:%M:%S").to_string(),
                "timestamp_unit": unit,
            }))
        }
        "to_timestamp" => {
            let raw = arg_str(args, 0, "");
            let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
                .map_err(|e| anyhow::anyhow!("时间戳转换失败: {}", e))?;
            let dt = naive
                .and_local_timezone(Local)
                .single()
                .ok_or_else(|| anyhow::anyhow!("时间戳转换失败: {}", raw))?;
            Ok(json!({
                "result": dt.timestamp(),
                "result_millisecond": dt.timestamp_millis(),
            }))
        }
        "current_timestamp" => {
            let now = Local::now();
            Ok(json!({
                "timestamp": now.timestamp(),
                "timestamp_millisecond": now.timestamp_millis(),
                "datetime": now.format("%Y-%m-%d %H:%M:%S").to_string(),
            }))
        }
        other => bail!("不支持的转换类型: {}", other),
    }
}

fn base64_encode(args: &[Value]) -> Result<Value> {
    let text = arg_str(args, 0, "");
    let encoded = STANDARD.encode(text.as_bytes());
    Ok(json!({
        "result": encoded,
        "original_length": text.chars().count(),
        "encoded_length": encoded.len(),
    }))
}

fn base64_decode(args: &[Value]) -> Result<Value> {
    let text = arg_str(args, 0, "");
    let bytes = STANDARD.decode(text.trim()).map_err(|_| anyhow::anyhow!("无效的Base64数据"))?;
    let decoded = String::from_utf8(bytes).map_err(|_| anyhow::anyhow!("无效的Base64数据"))?;
    Ok(json!({
        "result": decoded,
        "encoded_length": text.len(),
        "decoded_length": decoded.chars().count(),
    }))
}

fn url_encode(args: &[Value]) -> Result<Value> {
    let data = arg_str(args, 0, "");
    let encoded = utf8_percent_encode(&data, URL_ENCODE_SET).to_string();
    Ok(json!({
        "result": encoded,
        "original_length": data.chars().count(),
        "encoded_length": encoded.len(),
    }))
}

fn url_decode(args: &[Value]) -> Result<Value> {
    let data = arg_str(args, 0, "");
    let decoded = percent_decode_str(&data)
        .decode_utf8()
        .map_err(|e| anyhow::anyhow!("URL解码失败: {}", e))?
        .to_string();
    Ok(json!({
        "result": decoded,
        "encoded_length": data.len(),
        "decoded_length": decoded.chars().count(),
    }))
}

/// unicode_convert(text, convert_type='to_unicode')
fn unicode_convert(args: &[Value]) -> Result<Value> {
    let text = arg_str(args, 0, "");
    let convert_type = arg_str(args, 1, "to_unicode");

    match convert_type.as_str() {
        "to_unicode" => {
            let result: String = text.chars().map(|c| format!("\\u{:04x}", c as u32)).collect();
            Ok(json!({ "result": result, "original": text }))
        }
        "from_unicode" => {
            // 兼容双反斜杠形式 \\u6587
            let normalized = text.replace("\\\\u", "\\u");
            let result = decode_unicode_escapes(&normalized)?;
            Ok(json!({ "result": result, "original": normalized }))
        }
        other => bail!("不支持的转换类型: {}", other),
    }
}

fn decode_unicode_escapes(text: &str) -> Result<String> {
    let mut out = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'u') {
            chars.next();
            let hex: String = (0..4).filter_map(|_| chars.next()).collect();
            if hex.len() != 4 {
                bail!("Unicode转换失败: 截断的转义序列");
            }
            let code = u32::from_str_radix(&hex, 16).map_err(|_| anyhow::anyhow!("Unicode转换失败: \\u{}", hex))?;
            match char::from_u32(code) {
                Some(decoded) => out.push(decoded),
                None => bail!("Unicode转换失败: 无效码点 \\u{}", hex),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// ascii_convert(text, convert_type='to_ascii')
fn ascii_convert(args: &[Value]) -> Result<Value> {
    let text = arg_str(args, 0, "");
    let convert_type = arg_str(args, 1, "to_ascii");

    match convert_type.as_str() {
        "to_ascii" => {
            let codes: Vec<u32> = text.chars().map(|c| c as u32).collect();
            let hex: Vec<String> = codes.iter().map(|code| format!("{:02x}", code)).collect();
            Ok(json!({ "result": codes, "original": text, "hex": hex }))
        }
        "from_ascii" => {
            // 逗号或空格分隔的码值
            let codes: Vec<u32> = text
                .replace(',', " ")
                .split_whitespace()
                .map(|part| part.parse().map_err(|_| anyhow::anyhow!("ASCII转换失败: {}", part)))
                .collect::<Result<_>>()?;
            let result: String = codes
                .iter()
                .map(|&code| char::from_u32(code).ok_or_else(|| anyhow::anyhow!("ASCII转换失败: 无效码值 {}", code)))
                .collect::<Result<_>>()?;
            Ok(json!({ "result": result, "codes": codes }))
        }
        other => bail!("不支持的转换类型: {}", other),
    }
}

/// color_convert(color, from_type='hex', to_type='rgb')
fn color_convert(args: &[Value]) -> Result<Value> {
    let color = arg_str(args, 0, "");
    let from_type = arg_str(args, 1, "hex");
    let to_type = arg_str(args, 2, "rgb");

    let rgb: [u8; 3] = match from_type.as_str() {
        "hex" => {
            let hex = color.trim_start_matches('#');
            // 长度按字节判断，必须纯 ASCII 才能安全切片
            if hex.len() != 6 || !hex.is_ascii() {
                bail!("颜色转换失败: {}", color);
            }
            let mut out = [0u8; 3];
            for (i, chunk) in out.iter_mut().enumerate() {
                *chunk = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                    .map_err(|_| anyhow::anyhow!("颜色转换失败: {}", color))?;
            }
            out
        }
        "rgb" => {
            let inner = color.trim_start_matches("rgb(").trim_end_matches(')');
            let parts: Vec<u8> = inner
                .split(',')
                .map(|p| p.trim().parse().map_err(|_| anyhow::anyhow!("颜色转换失败: {}", color)))
                .collect::<Result<_>>()?;
            if parts.len() != 3 {
                bail!("颜色转换失败: {}", color);
            }
            [parts[0], parts[1], parts[2]]
        }
        other => bail!("不支持的颜色类型: {}", other),
    };

    let [r, g, b] = rgb;
    let result = match to_type.as_str() {
        "hex" => format!("#{:02x}{:02x}{:02x}", r, g, b),
        "rgb" => format!("rgb({}, {}, {})", r, g, b),
        "rgba" => format!("rgba({}, {}, {}, 1.0)", r, g, b),
        "hsl" => {
            let (rf, gf, bf) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
            let max = rf.max(gf).max(bf);
            let min = rf.min(gf).min(bf);
            let l = (max + min) / 2.0;

            let (h, s) = if (max - min).abs() < f64::EPSILON {
                (0.0, 0.0)
            } else {
                let d = max - min;
                let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
                let mut h = if max == rf {
                    (gf - bf) / d + if gf < bf { 6.0 } else { 0.0 }
                } else if max == gf {
                    (bf - rf) / d + 2.0
                } else {
                    (rf - gf) / d + 4.0
                };
                h /= 6.0;
                (h, s)
            };
            format!("hsl({:.1}, {:.1}%, {:.1}%)", h * 360.0, s * 100.0, l * 100.0)
        }
        other => bail!("不支持的转换类型: {}", other),
    };

    Ok(json!({
        "result": result,
        "from_type": from_type,
        "to_type": to_type,
        "rgb": rgb.to_vec(),
    }))
}

/// base_convert(number, from_base=10, to_base=16)
fn base_convert(args: &[Value]) -> Result<Value> {
    let num_str = arg_str(args, 0, "0");
    let from_base = arg_i64(args, 1, 10);
    let to_base = arg_i64(args, 2, 16);

    if !(2..=36).contains(&from_base) || !(2..=36).contains(&to_base) {
        bail!("不支持的进制: {} -> {}", from_base, to_base);
    }

    let decimal = i64::from_str_radix(num_str.trim(), from_base as u32)
        .map_err(|_| anyhow::anyhow!("进制转换失败: {}", num_str))?;

    let result = match to_base {
        10 => decimal.to_string(),
        2 => format!("{:b}", decimal.unsigned_abs()),
        8 => format!("{:o}", decimal.unsigned_abs()),
        16 => format!("{:X}", decimal.unsigned_abs()),
        base => to_radix(decimal.unsigned_abs(), base as u64),
    };
    let result = if decimal < 0 && to_base != 10 {
        format!("-{}", result)
    } else {
        result
    };

    Ok(json!({
        "result": result,
        "from_base": from_base,
        "to_base": to_base,
        "decimal_value": decimal,
    }))
}

fn to_radix(mut n: u64, base: u64) -> String {
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % base) as usize]);
        n /= base;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// generate_barcode(data, barcode_type='code39')
///
/// 返回条码的 0/1 位串文本，不落盘生成图片。
fn generate_barcode(args: &[Value]) -> Result<Value> {
    use barcoders::sym::code39::Code39;
    use barcoders::sym::ean13::EAN13;
    use barcoders::sym::ean8::EAN8;

    let data = arg_str(args, 0, "").trim().to_string();
    let barcode_type = arg_str(args, 1, "code39");

    if data.is_empty() {
        bail!("请输入要编码的数据");
    }

    let encoded: Vec<u8> = match barcode_type.as_str() {
        "code39" => Code39::new(data.clone())
            .map_err(|e| anyhow::anyhow!("条形码生成失败: {}", e))?
            .encode(),
        "ean13" => {
            if !data.bytes().all(|b| b.is_ascii_digit()) {
                bail!("EAN13条形码只能包含数字");
            }
            if data.len() != 12 {
                bail!("EAN13条形码需要12位数字，当前输入了{}位数字", data.len());
            }
            EAN13::new(data.clone())
                .map_err(|e| anyhow::anyhow!("条形码生成失败: {}", e))?
                .encode()
        }
        "ean8" => {
            if !data.bytes().all(|b| b.is_ascii_digit()) {
                bail!("EAN8条形码只能包含数字");
            }
            if data.len() != 7 {
                bail!("EAN8条形码需要7位数字，当前输入了{}位数字", data.len());
            }
            EAN8::new(data.clone())
                .map_err(|e| anyhow::anyhow!("条形码生成失败: {}", e))?
                .encode()
        }
        other => bail!("不支持的条形码类型: {}，支持类型: code39, ean13, ean8", other),
    };

    let bits: String = encoded.iter().map(|&b| if b == 1 { '1' } else { '0' }).collect();
    Ok(json!({
        "result": bits,
        "data": data,
        "barcode_type": barcode_type,
        "width": bits.len(),
    }))
}

/// generate_qrcode(data)，渲染为 Unicode 块字符文本
fn generate_qrcode(args: &[Value]) -> Result<Value> {
    use qrcode::QrCode;
    use qrcode::render::unicode;

    let data = arg_str(args, 0, "");
    if data.is_empty() {
        bail!("请输入要编码的数据");
    }

    let code = QrCode::new(data.as_bytes()).map_err(|e| anyhow::anyhow!("二维码生成失败: {}", e))?;
    let rendered = code
        .render::<unicode::Dense1x2>()
        .quiet_zone(false)
        .build();

    Ok(json!({
        "result": rendered,
        "data": data,
        "width": code.width(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_round_trip() {
        let encoded = base64_encode(&[json!("hello 世界")]).unwrap();
        let decoded = base64_decode(&[encoded["result"].clone()]).unwrap();
        assert_eq!(decoded["result"], json!("hello 世界"));
    }

    #[test]
    fn test_base64_decode_invalid() {
        assert!(base64_decode(&[json!("!!not base64!!")]).is_err());
    }

    #[test]
    fn test_url_encode_decode() {
        let encoded = url_encode(&[json!("a b/c?")]).unwrap();
        assert_eq!(encoded["result"], json!("a%20b%2Fc%3F"));
        let decoded = url_decode(&[encoded["result"].clone()]).unwrap();
        assert_eq!(decoded["result"], json!("a b/c?"));
    }

    #[test]
    fn test_unicode_convert_round_trip() {
        let out = unicode_convert(&[json!("中文")]).unwrap();
        assert_eq!(out["result"], json!("\\u4e2d\\u6587"));

        let back = unicode_convert(&[out["result"].clone(), json!("from_unicode")]).unwrap();
        assert_eq!(back["result"], json!("中文"));
    }

    #[test]
    fn test_ascii_convert() {
        let out = ascii_convert(&[json!("AB")]).unwrap();
        assert_eq!(out["result"], json!([65, 66]));

        let back = ascii_convert(&[json!("65, 66"), json!("from_ascii")]).unwrap();
        assert_eq!(back["result"], json!("AB"));
    }

    #[test]
    fn test_color_convert_hex_to_rgb() {
        let out = color_convert(&[json!("#ff8000")]).unwrap();
        assert_eq!(out["result"], json!("rgb(255, 128, 0)"));
        assert_eq!(out["rgb"], json!([255, 128, 0]));
    }

    #[test]
    fn test_color_convert_rgb_to_hex() {
        let out = color_convert(&[json!("rgb(255, 128, 0)"), json!("rgb"), json!("hex")]).unwrap();
        assert_eq!(out["result"], json!("#ff8000"));
    }

    #[test]
    fn test_color_convert_rejects_bad_hex() {
        // 多字节字符凑够 6 个字节也必须报错，不能切片崩溃
        assert!(color_convert(&[json!("#中文")]).is_err());
        assert!(color_convert(&[json!("#fff")]).is_err());
        assert!(color_convert(&[json!("#gggggg")]).is_err());
    }

    #[test]
    fn test_base_convert() {
        let out = base_convert(&[json!(255)]).unwrap();
        assert_eq!(out["result"], json!("FF"));
        assert_eq!(out["decimal_value"], json!(255));

        let out = base_convert(&[json!("ff"), json!(16), json!(2)]).unwrap();
        assert_eq!(out["result"], json!("11111111"));
    }

    #[test]
    fn test_timestamp_convert_auto_unit() {
        let sec = timestamp_convert(&[json!("1700000000")]).unwrap();
        assert_eq!(sec["timestamp_unit"], json!("second"));

        let ms = timestamp_convert(&[json!("1700000000000")]).unwrap();
        assert_eq!(ms["timestamp_unit"], json!("millisecond"));
        assert_eq!(sec["result"], ms["result"]);
    }

    #[test]
    fn test_timestamp_convert_round_trip() {
        let dt = timestamp_convert(&[json!("1700000000")]).unwrap();
        let back = timestamp_convert(&[dt["result"].clone(), json!("to_timestamp")]).unwrap();
        assert_eq!(back["result"], json!(1700000000));
    }

    #[test]
    fn test_generate_barcode_code39() {
        let out = generate_barcode(&[json!("TEST123")]).unwrap();
        let bits = out["result"].as_str().unwrap();
        assert!(!bits.is_empty());
        assert!(bits.chars().all(|c| c == '0' || c == '1'));
    }

    #[test]
    fn test_generate_barcode_ean13_validation() {
        assert!(generate_barcode(&[json!("12345"), json!("ean13")]).is_err());
        assert!(generate_barcode(&[json!("abc"), json!("ean13")]).is_err());
        assert!(generate_barcode(&[json!("690123456789"), json!("ean13")]).is_ok());
    }

    #[test]
    fn test_generate_qrcode_renders() {
        let out = generate_qrcode(&[json!("https://example.com")]).unwrap();
        assert!(!out["result"].as_str().unwrap().is_empty());
        assert!(out["width"].as_u64().unwrap() > 0);
    }
}
