//! 结构化解码
//!
//! 标签名决定用哪一种 serde 数据模型把键值树解码为目标结构：
//! `json` 走 `serde_json`，`yaml` 走 `serde_yaml`，`toml` 走 `toml`。
//! 字段名映射由目标类型自身的 serde 属性决定。
//!
//! 解码是严格的：`"8080"` 不会自动解成整数，`"5s"` 也不会自动解成时长。
//! 需要宽松转换的字段通过 `#[serde(deserialize_with = "...")]` 使用 [`lenient`] 中的函数，
//! 转换规则与 `get_*` 系列读取方法一致。

use crate::error::SourceError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// 默认标签约定
pub const DEFAULT_TAG_NAME: &str = "json";

/// 把键值表解码为目标类型
pub fn decode_tree<T: DeserializeOwned>(tree: &Map<String, Value>, tag_name: &str) -> Result<T, SourceError> {
    decode_value(Value::Object(tree.clone()), tag_name)
}

/// 把任意值解码为目标类型
pub fn decode_value<T: DeserializeOwned>(value: Value, tag_name: &str) -> Result<T, SourceError> {
    let tag = tag_name.to_ascii_lowercase();
    match tag.as_str() {
        "json" => serde_json::from_value(value).map_err(|e| decode_error(&tag, e)),
        "yaml" | "yml" => {
            let yaml = serde_yaml::to_value(&value).map_err(|e| decode_error(&tag, e))?;
            serde_yaml::from_value(yaml).map_err(|e| decode_error(&tag, e))
        }
        "toml" => {
            let toml_value = toml::Value::try_from(strip_nulls(value)).map_err(|e| decode_error(&tag, e))?;
            toml_value.try_into().map_err(|e| decode_error(&tag, e))
        }
        _ => Err(SourceError::UnknownTag(tag_name.to_string())),
    }
}

/// TOML 没有空值，解码前去掉值为 null 的键
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

fn decode_error(tag: &str, e: impl std::fmt::Display) -> SourceError {
    SourceError::Decode {
        tag: tag.to_string(),
        message: e.to_string(),
    }
}

/// 宽松字段解码
///
/// ```
/// use serde::Deserialize;
/// use std::time::Duration;
///
/// #[derive(Deserialize)]
/// struct Http {
///     #[serde(deserialize_with = "confhub::config::decode::lenient::int")]
///     port: i64,
///     #[serde(deserialize_with = "confhub::config::decode::lenient::duration")]
///     timeout: Duration,
/// }
/// ```
pub mod lenient {
    use crate::config::cast;
    use serde::de::{Deserialize, Deserializer, Error};
    use serde_json::Value;
    use std::time::Duration;

    fn convert<'de, D, T>(deserializer: D, what: &str, f: impl FnOnce(&Value) -> Option<T>) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        f(&value).ok_or_else(|| D::Error::custom(format!("无法把 {} 转换为{}", value, what)))
    }

    pub fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        convert(deserializer, "整数", cast::to_i64)
    }

    pub fn uint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        convert(deserializer, "无符号整数", cast::to_u64)
    }

    pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        convert(deserializer, "浮点数", cast::to_f64)
    }

    pub fn boolean<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        convert(deserializer, "布尔值", cast::to_bool)
    }

    /// `30s`、`1h15m` 或纳秒整数
    pub fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        convert(deserializer, "时长", cast::to_duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct MyServer {
        name: String,
        #[serde(default)]
        env: String,
    }

    fn tree(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_decode_with_each_tag() {
        let t = tree(json!({"name": "confhub", "env": "test"}));
        for tag in ["json", "yaml", "toml", "YAML"] {
            let server: MyServer = decode_tree(&t, tag).unwrap();
            assert_eq!(
                server,
                MyServer {
                    name: "confhub".to_string(),
                    env: "test".to_string()
                }
            );
        }
    }

    #[test]
    fn test_decode_missing_field_uses_default() {
        let server: MyServer = decode_tree(&tree(json!({"name": "confhub"})), "json").unwrap();
        assert_eq!(server.env, "");
    }

    #[test]
    fn test_decode_type_mismatch() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct WithPort {
            port: i64,
        }

        let result: Result<WithPort, _> = decode_tree(&tree(json!({"port": "noport"})), "json");
        assert!(matches!(result, Err(SourceError::Decode { .. })));
    }

    #[test]
    fn test_lenient_fields() {
        #[derive(Debug, Deserialize)]
        struct Http {
            #[serde(deserialize_with = "lenient::int")]
            port: i64,
            #[serde(deserialize_with = "lenient::duration")]
            timeout: std::time::Duration,
            #[serde(deserialize_with = "lenient::boolean")]
            tls: bool,
        }

        let t = tree(json!({"port": "8080", "timeout": "5s", "tls": "true"}));
        for tag in ["json", "yaml", "toml"] {
            let http: Http = decode_tree(&t, tag).unwrap();
            assert_eq!(http.port, 8080);
            assert_eq!(http.timeout, std::time::Duration::from_secs(5));
            assert!(http.tls);
        }

        let result: Result<Http, _> =
            decode_tree(&tree(json!({"port": "noport", "timeout": "5s", "tls": true})), "json");
        assert!(matches!(result, Err(SourceError::Decode { .. })));
    }

    #[test]
    fn test_strict_decode_rejects_numeric_strings() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Http {
            port: i64,
        }

        let result: Result<Http, _> = decode_tree(&tree(json!({"port": "8080"})), "json");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_unknown_tag() {
        let result: Result<MyServer, _> = decode_tree(&tree(json!({"name": "x"})), "mapstructure");
        assert!(matches!(result, Err(SourceError::UnknownTag(t)) if t == "mapstructure"));
    }

    #[test]
    fn test_decode_time_field() {
        #[derive(Debug, Deserialize)]
        struct WithDate {
            date: DateTime<FixedOffset>,
        }

        let decoded: WithDate =
            decode_tree(&tree(json!({"date": "2021-11-17T16:25:15+08:00"})), "json").unwrap();
        assert_eq!(decoded.date.to_rfc3339(), "2021-11-17T16:25:15+08:00");
    }

    #[test]
    fn test_toml_tag_tolerates_nulls() {
        let server: MyServer = decode_tree(&tree(json!({"name": "confhub", "extra": null})), "toml").unwrap();
        assert_eq!(server.name, "confhub");
    }
}
