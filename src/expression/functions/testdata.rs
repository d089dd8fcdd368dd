//! 业务测试数据生成
//!
//! 中文姓名、手机号、邮箱、地址、证件号码等。身份证、银行卡、
//! 统一社会信用代码均带合法校验位，可通过常规格式校验。

use anyhow::{Result, bail};
use chrono::{Datelike, Duration, Local, NaiveDate};
use rand::Rng;
use serde_json::{Value, json};

use crate::expression::args::{arg_bool, arg_str, arg_usize};
use crate::expression::registry::FunctionRegistry;

const SURNAMES: &[&str] = &[
    "王", "李", "张", "刘", "陈", "杨", "黄", "赵", "吴", "周", "徐", "孙", "马", "朱", "胡", "郭",
    "何", "林", "罗", "郑", "梁", "谢", "宋", "唐", "许", "韩", "冯", "邓", "曹", "彭",
];
const GIVEN_MALE: &str = "伟强磊军洋勇杰涛超明刚平辉健鹏斌波辰宇浩轩泽";
const GIVEN_FEMALE: &str = "芳娜敏静丽娟艳萍燕玲颖雪琴婷梦瑶欣怡雨桐子涵";
const PHONE_PREFIXES: &[&str] = &[
    "130", "131", "132", "133", "135", "136", "137", "138", "139", "150", "151", "152", "155",
    "156", "157", "158", "159", "166", "176", "177", "178", "180", "181", "182", "183", "185",
    "186", "187", "188", "189", "199",
];
const EMAIL_DOMAINS: &[&str] = &["qq.com", "163.com", "126.com", "sina.com", "sohu.com", "gmail.com", "outlook.com"];
const PROVINCES: &[&str] = &["北京市", "上海市", "广东省", "江苏省", "浙江省", "四川省", "湖北省", "山东省", "福建省", "湖南省"];
const CITIES: &[&str] = &["广州市", "深圳市", "南京市", "杭州市", "成都市", "武汉市", "济南市", "厦门市", "长沙市", "苏州市"];
const DISTRICTS: &[&str] = &["朝阳区", "海淀区", "浦东新区", "天河区", "鼓楼区", "西湖区", "武侯区", "江汉区", "历下区", "思明区"];
const STREETS: &[&str] = &["人民路", "中山路", "解放路", "建设路", "和平街", "文化路", "新华街", "长江路", "黄河路", "科技大道"];
const COMPANY_WORDS: &[&str] = &["恒达", "宏远", "瑞丰", "华信", "天成", "鑫源", "泰和", "博瑞", "盛世", "远景"];
const COMPANY_INDUSTRIES: &[&str] = &["科技", "网络", "信息", "贸易", "传媒", "实业", "数据", "软件"];
const JOBS: &[&str] = &["软件工程师", "产品经理", "测试工程师", "运营专员", "数据分析师", "设计师", "项目经理", "销售经理"];
// 地级市行政区划代码，身份证前 6 位
const AREA_CODES: &[&str] = &[
    "110101", "310101", "440103", "440304", "320102", "330106", "510107", "420102", "370102", "350203",
];

pub fn register(registry: &mut FunctionRegistry) {
    registry.register("random_name", chinese_name);
    registry.register("generate_chinese_name", chinese_name);
    registry.register("random_phone", chinese_phone);
    registry.register("generate_chinese_phone", chinese_phone);
    registry.register("random_email", chinese_email);
    registry.register("generate_chinese_email", chinese_email);
    registry.register("random_address", chinese_address);
    registry.register("generate_chinese_address", chinese_address);
    registry.register("random_id_card", id_card);
    registry.register("generate_id_card", id_card);
    registry.register("random_company", company_name);
    registry.register("generate_company_name", company_name);
    registry.register("generate_bank_card", bank_card);
    registry.register("generate_hk_id_card", hk_id_card);
    registry.register("generate_business_license", business_license);
    registry.register("generate_user_profile", user_profile);
    registry.register("generate_coordinates", coordinates);
}

fn repeated(count: usize, mut generate: impl FnMut() -> Result<Value>) -> Result<Value> {
    if count == 1 {
        Ok(json!({ "result": generate()? }))
    } else {
        let items = (0..count).map(|_| generate()).collect::<Result<Vec<_>>>()?;
        Ok(json!({ "result": items, "count": items.len() }))
    }
}

fn pick<'a>(items: &'a [&str]) -> &'a str {
    items[rand::rng().random_range(0..items.len())]
}

fn pick_char(charset: &str) -> char {
    let chars: Vec<char> = charset.chars().collect();
    chars[rand::rng().random_range(0..chars.len())]
}

fn make_name(gender: &str) -> String {
    let mut rng = rand::rng();
    let surname = pick(SURNAMES);
    let given_set = match gender {
        "male" => GIVEN_MALE,
        "female" => GIVEN_FEMALE,
        _ => {
            if rng.random::<bool>() {
                GIVEN_MALE
            } else {
                GIVEN_FEMALE
            }
        }
    };
    let given_len = rng.random_range(1..=2usize);
    let given: String = (0..given_len).map(|_| pick_char(given_set)).collect();
    format!("{}{}", surname, given)
}

fn make_phone() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..8).map(|_| char::from(b'0' + rng.random_range(0..10u8))).collect();
    format!("{}{}", pick(PHONE_PREFIXES), suffix)
}

fn make_email(domain: &str) -> String {
    let mut rng = rand::rng();
    let len = rng.random_range(6..=12usize);
    let username: String = (0..len)
        .map(|_| {
            let c = rng.random_range(0..36u32);
            if c < 26 {
                char::from(b'a' + c as u8)
            } else {
                char::from(b'0' + (c - 26) as u8)
            }
        })
        .collect();
    let domain = if domain == "random" { pick(EMAIL_DOMAINS) } else { domain };
    format!("{}@{}", username, domain)
}

fn make_address(full: bool) -> String {
    let mut rng = rand::rng();
    let city = pick(CITIES);
    if !full {
        return city.to_string();
    }
    format!(
        "{}{}{}{}{}号",
        pick(PROVINCES),
        city,
        pick(DISTRICTS),
        pick(STREETS),
        rng.random_range(1..=999u32)
    )
}

/// 随机出生日期，年龄在 [min_age, max_age] 之间
fn make_birthday(min_age: i64, max_age: i64) -> NaiveDate {
    let today = Local::now().date_naive();
    let days = rand::rng().random_range((min_age * 365)..=(max_age * 365));
    today - Duration::days(days)
}

/// 18 位身份证号，含 GB 11643 校验码
fn make_id_card() -> String {
    let mut rng = rand::rng();
    let area = pick(AREA_CODES);
    let birthday = make_birthday(18, 65);
    let seq: String = (0..3).map(|_| char::from(b'0' + rng.random_range(0..10u8))).collect();
    let body = format!("{}{:04}{:02}{:02}{}", area, birthday.year(), birthday.month(), birthday.day(), seq);

    const WEIGHTS: [u32; 17] = [7, 9, 10, 5, 8, 4, 2, 1, 6, 3, 7, 9, 10, 5, 8, 4, 2];
    const CHECK_CHARS: [char; 11] = ['1', '0', 'X', '9', '8', '7', '6', '5', '4', '3', '2'];
    let sum: u32 = body
        .bytes()
        .zip(WEIGHTS)
        .map(|(b, w)| (b - b'0') as u32 * w)
        .sum();
    format!("{}{}", body, CHECK_CHARS[(sum % 11) as usize])
}

/// 银联卡号，BIN 前缀加 Luhn 校验位
fn make_bank_card() -> String {
    const BINS: &[&str] = &["622202", "622848", "621226", "622700", "621661", "623668", "622262", "621483"];
    let mut rng = rand::rng();
    let bin = pick(BINS);
    let total_len = if rng.random::<bool>() { 16 } else { 19 };
    let mut digits: Vec<u8> = bin.bytes().map(|b| b - b'0').collect();
    while digits.len() < total_len - 1 {
        digits.push(rng.random_range(0..10u8));
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            let mut v = d as u32;
            if i % 2 == 0 {
                v *= 2;
                if v > 9 {
                    v -= 9;
                }
            }
            v
        })
        .sum();
    let check = (10 - sum % 10) % 10;
    digits.push(check as u8);
    digits.iter().map(|d| char::from(b'0' + d)).collect()
}

/// 18 位统一社会信用代码（营业执照号），GB 32100 校验字符
fn make_business_license() -> String {
    const CHARSET: &[u8] = b"0123456789ABCDEFGHJKLMNPQRTUWXY";
    const WEIGHTS: [u32; 17] = [1, 3, 9, 27, 19, 26, 16, 17, 20, 29, 25, 13, 8, 24, 10, 30, 28];
    let mut rng = rand::rng();

    let mut code = String::from("91");
    code.push_str(pick(AREA_CODES));
    for _ in 0..9 {
        code.push(char::from(CHARSET[rng.random_range(0..CHARSET.len())]));
    }

    let sum: u32 = code
        .bytes()
        .zip(WEIGHTS)
        .map(|(b, w)| CHARSET.iter().position(|&c| c == b).unwrap_or(0) as u32 * w)
        .sum();
    let check = (31 - sum % 31) % 31;
    code.push(char::from(CHARSET[check as usize]));
    code
}

/// 香港身份证: 字母 + 6 位数字 + 括号内校验码
fn make_hk_id_card() -> String {
    let mut rng = rand::rng();
    let letter = char::from(b'A' + rng.random_range(0..26u8));
    let numbers: Vec<u32> = (0..6).map(|_| rng.random_range(0..10u32)).collect();

    let letter_value = (letter as u32 - 'A' as u32 + 1) * 8;
    const WEIGHTS: [u32; 6] = [7, 6, 5, 4, 3, 2];
    let number_value: u32 = numbers.iter().zip(WEIGHTS).map(|(n, w)| n * w).sum();
    let remainder = (letter_value + number_value) % 11;
    let check = match remainder {
        0 => "0".to_string(),
        1 => "A".to_string(),
        r => (11 - r).to_string(),
    };

    let digits: String = numbers.iter().map(|n| n.to_string()).collect();
    format!("{}{}({})", letter, digits, check)
}

fn make_company(company_type: &str) -> String {
    let name = format!("{}{}{}有限公司", pick(CITIES).trim_end_matches('市'), pick(COMPANY_WORDS), pick(COMPANY_INDUSTRIES));
    if company_type == "all" {
        name
    } else {
        name.replace("有限公司", company_type)
    }
}

/// generate_chinese_name(gender='random', count=1)
fn chinese_name(args: &[Value]) -> Result<Value> {
    let gender = arg_str(args, 0, "random");
    let count = arg_usize(args, 1, 1);
    repeated(count, || Ok(json!(make_name(&gender))))
}

/// generate_chinese_phone(count=1)
fn chinese_phone(args: &[Value]) -> Result<Value> {
    let count = arg_usize(args, 0, 1);
    repeated(count, || Ok(json!(make_phone())))
}

/// generate_chinese_email(domain='random', count=1)
fn chinese_email(args: &[Value]) -> Result<Value> {
    let domain = arg_str(args, 0, "random");
    let count = arg_usize(args, 1, 1);
    repeated(count, || Ok(json!(make_email(&domain))))
}

/// generate_chinese_address(full_address=true, count=1)
fn chinese_address(args: &[Value]) -> Result<Value> {
    let full = arg_bool(args, 0, true);
    let count = arg_usize(args, 1, 1);
    repeated(count, || Ok(json!(make_address(full))))
}

fn id_card(args: &[Value]) -> Result<Value> {
    let count = arg_usize(args, 0, 1);
    repeated(count, || Ok(json!(make_id_card())))
}

/// generate_company_name(company_type='all', count=1)
fn company_name(args: &[Value]) -> Result<Value> {
    let company_type = arg_str(args, 0, "all");
    let count = arg_usize(args, 1, 1);
    repeated(count, || Ok(json!(make_company(&company_type))))
}

fn bank_card(args: &[Value]) -> Result<Value> {
    let count = arg_usize(args, 0, 1);
    repeated(count, || Ok(json!(make_bank_card())))
}

fn hk_id_card(args: &[Value]) -> Result<Value> {
    let count = arg_usize(args, 0, 1);
    repeated(count, || Ok(json!(make_hk_id_card())))
}

fn business_license(args: &[Value]) -> Result<Value> {
    let count = arg_usize(args, 0, 1);
    repeated(count, || Ok(json!(make_business_license())))
}

fn user_profile(args: &[Value]) -> Result<Value> {
    let count = arg_usize(args, 0, 1);
    repeated(count, || {
        let mut rng = rand::rng();
        let gender = if rng.random::<bool>() { "男" } else { "女" };
        let name_gender = if gender == "男" { "male" } else { "female" };
        Ok(json!({
            "name": make_name(name_gender),
            "phone": make_phone(),
            "email": make_email("random"),
            "address": make_address(true),
            "id_card": make_id_card(),
            "company": make_company("all"),
            "job": pick(JOBS),
            "age": rng.random_range(18..=65u32),
            "gender": gender,
            "birthday": make_birthday(18, 65).format("%Y-%m-%d").to_string(),
        }))
    })
}

/// 中国范围内的经纬度: 经度 73-135, 纬度 18-54
fn coordinates(args: &[Value]) -> Result<Value> {
    let count = arg_usize(args, 0, 1);
    repeated(count, || {
        let mut rng = rand::rng();
        let longitude: f64 = format!("{:.6}", rng.random_range(73.0..=135.0)).parse()?;
        let latitude: f64 = format!("{:.6}", rng.random_range(18.0..=54.0)).parse()?;
        Ok(json!({
            "longitude": longitude,
            "latitude": latitude,
            "longitude_formatted": format!("{:.6}°", longitude),
            "latitude_formatted": format!("{:.6}°", latitude),
        }))
    })
}
