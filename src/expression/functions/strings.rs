//! 字符处理函数

use anyhow::{Result, bail};
use regex::Regex;
use serde_json::{Value, json};
use std::sync::OnceLock;

use crate::expression::args::arg_str;
use crate::expression::registry::FunctionRegistry;

pub fn register(registry: &mut FunctionRegistry) {
    registry.register("remove_whitespace", remove_whitespace);
    registry.register("replace_string", replace_string);
    registry.register("word_count", word_count);
    registry.register("regex_test", regex_test);
    registry.register("case_convert", case_convert);
}

/// 去除全部空白字符（含换行）
fn remove_whitespace(args: &[Value]) -> Result<Value> {
    static WS: OnceLock<Regex> = OnceLock::new();
    let re = WS.get_or_init(|| Regex::new(r"\s+").unwrap());

    let text = arg_str(args, 0, "");
    let result = re.replace_all(&text, "").to_string();
    Ok(json!({
        "result": result,
        "original_length": text.chars().count(),
        "new_length": result.chars().count(),
    }))
}

/// replace_string(text, old, new)，字面替换
fn replace_string(args: &[Value]) -> Result<Value> {
    let text = arg_str(args, 0, "");
    let old = arg_str(args, 1, "");
    let new = arg_str(args, 2, "");

    let replacements = if old.is_empty() { 0 } else { text.matches(&old).count() };
    Ok(json!({
        "result": text.replace(&old, &new),
        "replacements": replacements,
    }))
}

/// 字数统计，区分中文字符、英文单词、数字与标点
fn word_count(args: &[Value]) -> Result<Value> {
    static CHINESE: OnceLock<Regex> = OnceLock::new();
    static ENGLISH: OnceLock<Regex> = OnceLock::new();
    static NUMBERS: OnceLock<Regex> = OnceLock::new();
    static PUNCT: OnceLock<Regex> = OnceLock::new();

    let chinese = CHINESE.get_or_init(|| Regex::new(r"[一-鿿]").unwrap());
    let english = ENGLISH.get_or_init(|| Regex::new(r"\b[a-zA-Z]+\b").unwrap());
    let numbers = NUMBERS.get_or_init(|| Regex::new(r"\d+").unwrap());
    let punct = PUNCT.get_or_init(|| Regex::new(r"[^\w\s一-鿿]").unwrap());

    let text = arg_str(args, 0, "");
    Ok(json!({
        "total_length": text.chars().count(),
        "chinese_chars": chinese.find_iter(&text).count(),
        "english_words": english.find_iter(&text).count(),
        "numbers": numbers.find_iter(&text).count(),
        "punctuation": punct.find_iter(&text).count(),
        "lines": text.split('\n').count(),
        "paragraphs": text.split('\n').filter(|p| !p.trim().is_empty()).count(),
    }))
}

/// regex_test(pattern, text, flags)，flags 支持 i/m/s/x
fn regex_test(args: &[Value]) -> Result<Value> {
    let pattern = arg_str(args, 0, "");
    let text = arg_str(args, 1, "");
    let flags = arg_str(args, 2, "");

    let inline: String = flags.chars().filter(|c| "imsx".contains(*c)).collect();
    let full_pattern = if inline.is_empty() {
        pattern.clone()
    } else {
        format!("(?{}){}", inline, pattern)
    };

    let re = match Regex::new(&full_pattern) {
        Ok(re) => re,
        Err(e) => bail!("正则表达式错误: {}", e),
    };

    let matches: Vec<&str> = re.find_iter(&text).map(|m| m.as_str()).collect();
    let groups: Vec<Value> = re
        .captures(&text)
        .map(|caps| {
            caps.iter()
                .skip(1)
                .map(|g| match g {
                    Some(m) => json!(m.as_str()),
                    None => Value::Null,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(json!({
        "matches": matches,
        "match_count": matches.len(),
        "groups": groups,
        "is_valid": true,
    }))
}

/// case_convert(text, convert_type='upper')
fn case_convert(args: &[Value]) -> Result<Value> {
    let text = arg_str(args, 0, "");
    let convert_type = arg_str(args, 1, "upper");

    let result = match convert_type.as_str() {
        "upper" => text.to_uppercase(),
        "lower" => text.to_lowercase(),
        "capitalize" => capitalize(&text.to_lowercase()),
        "title" => text
            .split(' ')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
        "swapcase" => text
            .chars()
            .flat_map(|c| {
                if c.is_uppercase() {
                    c.to_lowercase().collect::<Vec<_>>()
                } else {
                    c.to_uppercase().collect::<Vec<_>>()
                }
            })
            .collect(),
        other => bail!("不支持的转换类型: {}", other),
    };

    Ok(json!({ "result": result, "original": text }))
}

fn capitalize(word: impl AsRef<str>) -> String {
    let word = word.as_ref();
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_whitespace() {
        let out = remove_whitespace(&[json!("a b\nc\t d")]).unwrap();
        assert_eq!(out["result"], json!("abcd"));
        assert_eq!(out["new_length"], json!(4));
    }

    #[test]
    fn test_replace_string_counts() {
        let out = replace_string(&[json!("aXbXc"), json!("X"), json!("-")]).unwrap();
        assert_eq!(out["result"], json!("a-b-c"));
        assert_eq!(out["replacements"], json!(2));
    }

    #[test]
    fn test_word_count_mixed() {
        let out = word_count(&[json!("hello 世界 123!")]).unwrap();
        assert_eq!(out["chinese_chars"], json!(2));
        assert_eq!(out["english_words"], json!(1));
        assert_eq!(out["numbers"], json!(1));
        assert_eq!(out["lines"], json!(1));
    }

    #[test]
    fn test_regex_test_matches_and_groups() {
        let out = regex_test(&[json!(r"(\d+)-(\d+)"), json!("10-20 and 30-40")]).unwrap();
        assert_eq!(out["match_count"], json!(2));
        assert_eq!(out["groups"], json!(["10", "20"]));
        assert_eq!(out["is_valid"], json!(true));
    }

    #[test]
    fn test_regex_test_with_flags() {
        let out = regex_test(&[json!("^abc"), json!("ABC"), json!("i")]).unwrap();
        assert_eq!(out["match_count"], json!(1));
    }

    #[test]
    fn test_regex_test_invalid_pattern() {
        assert!(regex_test(&[json!("("), json!("x")]).is_err());
    }

    #[test]
    fn test_case_convert() {
        assert_eq!(
            case_convert(&[json!("hello world"), json!("title")]).unwrap()["result"],
            json!("Hello World")
        );
        assert_eq!(
            case_convert(&[json!("AbC"), json!("swapcase")]).unwrap()["result"],
            json!("aBc")
        );
        assert!(case_convert(&[json!("x"), json!("nope")]).is_err());
    }
}
