//! 配置文件加载器实现
//!
//! 提供 YAML / JSON / TOML 解析、环境变量替换和错误处理功能，
//! 所有格式统一解析为 `serde_json::Value` 键值树。

use crate::error::SourceError;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::path::Path;

/// 配置格式解析器trait
pub trait FormatLoader: Send + Sync {
    /// 格式名称
    fn format(&self) -> &'static str;

    /// 把文件内容解析为键值树
    fn parse(&self, content: &str) -> Result<Value, SourceError>;
}

/// YAML 解析器
#[derive(Debug, Clone, Copy)]
pub struct YamlLoader;

/// JSON 解析器
#[derive(Debug, Clone, Copy)]
pub struct JsonLoader;

/// TOML 解析器
#[derive(Debug, Clone, Copy)]
pub struct TomlLoader;

impl FormatLoader for YamlLoader {
    fn format(&self) -> &'static str {
        "yaml"
    }

    fn parse(&self, content: &str) -> Result<Value, SourceError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| parse_error(self.format(), e))?;
        Ok(yaml_to_json(value))
    }
}

impl FormatLoader for JsonLoader {
    fn format(&self) -> &'static str {
        "json"
    }

    fn parse(&self, content: &str) -> Result<Value, SourceError> {
        if content.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(content).map_err(|e| parse_error(self.format(), e))
    }
}

impl FormatLoader for TomlLoader {
    fn format(&self) -> &'static str {
        "toml"
    }

    fn parse(&self, content: &str) -> Result<Value, SourceError> {
        let table: toml::Table = toml::from_str(content).map_err(|e| parse_error(self.format(), e))?;
        Ok(toml_to_json(toml::Value::Table(table)))
    }
}

/// 根据配置类型选择解析器
pub fn loader_for(config_type: &str) -> Result<&'static dyn FormatLoader, SourceError> {
    match config_type.to_ascii_lowercase().as_str() {
        "yaml" | "yml" => Ok(&YamlLoader),
        "json" => Ok(&JsonLoader),
        "toml" => Ok(&TomlLoader),
        other => Err(SourceError::UnsupportedType(other.to_string())),
    }
}

/// 配置源加载器
#[derive(Debug, Clone, Default)]
pub struct SourceLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl SourceLoader {
    /// 创建新的配置源加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否在解析前替换 `${VAR}` 形式的环境变量
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    /// * `config_type` - 配置类型
    ///
    /// # 返回
    /// * `Result<Map<String, Value>, SourceError>` - 顶层键值表或错误
    pub fn load_from_file(
        &self,
        path: &Path,
        config_type: &str,
    ) -> Result<Map<String, Value>, SourceError> {
        let loader = loader_for(config_type)?;

        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SourceError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            },
            _ => SourceError::Io(e),
        })?;

        let table = self.parse_with(loader, &content)?;

        log::debug!("成功加载配置文件: {}", path.display());
        Ok(table)
    }

    /// 从字符串加载配置
    pub fn load_from_string(
        &self,
        content: &str,
        config_type: &str,
    ) -> Result<Map<String, Value>, SourceError> {
        let loader = loader_for(config_type)?;
        self.parse_with(loader, content)
    }

    fn parse_with(
        &self,
        loader: &dyn FormatLoader,
        content: &str,
    ) -> Result<Map<String, Value>, SourceError> {
        let processed = self.substitute_env_vars(content)?;

        match loader.parse(&processed)? {
            Value::Object(table) => Ok(table),
            // 空文件视为空配置
            Value::Null => Ok(Map::new()),
            other => Err(SourceError::Parse {
                format: loader.format().to_string(),
                message: format!("顶层必须是键值表，实际为: {}", value_kind(&other)),
            }),
        }
    }

    /// 替换字符串中的环境变量
    ///
    /// # 参数
    /// * `content` - 要处理的字符串
    ///
    /// # 返回
    /// * `Result<String, SourceError>` - 替换后的字符串或错误
    fn substitute_env_vars(&self, content: &str) -> Result<String, SourceError> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        // 匹配 ${VAR_NAME} 格式的环境变量
        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
            SourceError::Parse {
                format: "env".to_string(),
                message: format!("正则表达式错误: {}", e),
            }
        })?;

        let mut missing = None;
        let result = env_var_regex.replace_all(content, |captures: &regex::Captures| {
            let var_name = &captures[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    missing.get_or_insert_with(|| var_name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(var) => Err(SourceError::EnvVar { var }),
            None => Ok(result.into_owned()),
        }
    }
}

fn parse_error(format: &str, e: impl std::fmt::Display) -> SourceError {
    SourceError::Parse {
        format: format.to_string(),
        message: e.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(n.to_string()))
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
