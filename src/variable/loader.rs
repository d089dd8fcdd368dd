use crate::variable::types::{Environment, VarValue};
use crate::{Result, RusuiteError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 多环境配置文件
///
/// TOML 形式:
/// ```toml
/// [environments.dev]
/// base_url = "http://localhost:3000"
///
/// [environments.prod.token]
/// currentValue = ""
/// initialValue = "fallback"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentFile {
    #[serde(default)]
    pub environments: HashMap<String, HashMap<String, VarValue>>,
}

/// 环境加载器
///
/// 引擎本身不关心环境的存储方式，这里提供 TOML 文件与 JSON 文档
/// 两种上游常见形态的装载入口。
pub struct EnvironmentLoader;

impl EnvironmentLoader {
    /// 从指定路径加载 TOML 配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<EnvironmentFile> {
        let content = fs::read_to_string(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| RusuiteError::ParseError(format!("Failed to parse environment file: {}", e)))
    }

    /// 从配置文件中取出一个具名环境
    pub fn build_environment(file: &EnvironmentFile, name: &str) -> Option<Environment> {
        file.environments.get(name).map(|vars| Environment {
            name: name.to_string(),
            variables: vars.clone(),
        })
    }

    /// 从 JSON 对象构建环境（上游 CRUD 层传入的 variables 字段）
    pub fn from_json(name: &str, variables: Value) -> Result<Environment> {
        let variables: HashMap<String, VarValue> = serde_json::from_value(variables)?;
        Ok(Environment {
            name: name.to_string(),
            variables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_path() {
        let content = r#"
[environments.dev]
base_url = "http://localhost:8080"
api_key = "dev-key"

[environments.prod]
base_url = "https://api.example.com"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let file = EnvironmentLoader::load_from_path(temp_file.path()).unwrap();
        assert_eq!(file.environments.len(), 2);

        let dev = EnvironmentLoader::build_environment(&file, "dev").unwrap();
        assert_eq!(dev.name, "dev");
        assert_eq!(dev.get("base_url"), Some("http://localhost:8080".into()));
    }

    #[test]
    fn test_load_structured_value_from_toml() {
        let content = r#"
[environments.dev]
base_url = "http://localhost:8080"

[environments.dev.token]
currentValue = ""
initialValue = "fallback-token"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let file = EnvironmentLoader::load_from_path(temp_file.path()).unwrap();
        let dev = EnvironmentLoader::build_environment(&file, "dev").unwrap();
        assert_eq!(dev.get("token"), Some("fallback-token".into()));
    }

    #[test]
    fn test_missing_environment() {
        let file = EnvironmentFile::default();
        assert!(EnvironmentLoader::build_environment(&file, "nope").is_none());
    }

    #[test]
    fn test_from_json() {
        let env = EnvironmentLoader::from_json(
            "staging",
            json!({
                "host": "staging.example.com",
                "token": {"currentValue": "abc", "initialValue": "def"}
            }),
        )
        .unwrap();

        assert_eq!(env.get("host"), Some("staging.example.com".into()));
        assert_eq!(env.get("token"), Some("abc".into()));
    }
}
