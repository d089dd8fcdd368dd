//! 内置数据工厂函数
//!
//! 按类别拆分: 随机数据、业务测试数据、字符处理、编码转换、
//! 摘要加密、Crontab 表达式、时间日期。
//! 全部通过 [`register_builtins`] 显式挂入注册表。

pub mod crontab;
pub mod crypto;
pub mod datetime;
pub mod encoding;
pub mod random;
pub mod strings;
pub mod testdata;

use crate::expression::registry::FunctionRegistry;

/// 注册全部内置函数
pub fn register_builtins(registry: &mut FunctionRegistry) {
    random::register(registry);
    testdata::register(registry);
    strings::register(registry);
    encoding::register(registry);
    crypto::register(registry);
    crontab::register(registry);
    datetime::register(registry);
}
