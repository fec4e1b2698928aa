//! 配置读取接口
//!
//! 所有读取方法都基于点分路径，如 `server.http.port`，键名不区分大小写。键不存在或无法转换时
//! 返回对应类型的零值；`default_*` 系列在键不存在时返回调用方给出的回退值。
//! 每次读取只取一次原始值，重载期间不会读到前后不一致的结果。

use crate::config::cast;
use crate::config::store::SourceStore;
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

/// 配置读取trait
pub trait ConfigReader {
    /// 读取原始值，键不存在或值为空时返回 `None`
    fn get(&self, key: &str) -> Option<Value>;

    /// 返回完整的键值树
    fn all_settings(&self) -> Map<String, Value>;

    fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn has(&self, key: &str) -> bool {
        self.is_set(key)
    }

    /// 取出某个子树作为独立的存储
    fn sub(&self, key: &str) -> Option<SourceStore> {
        match self.get(key)? {
            Value::Object(map) => Some(SourceStore::from_map(map)),
            _ => None,
        }
    }

    fn get_string(&self, key: &str) -> String {
        self.get(key).map(|v| as_string(&v)).unwrap_or_default()
    }

    fn get_bool(&self, key: &str) -> bool {
        self.get(key).map(|v| as_bool(&v)).unwrap_or_default()
    }

    fn get_int(&self, key: &str) -> i64 {
        self.get_i64(key)
    }

    fn get_i32(&self, key: &str) -> i32 {
        self.get(key).map(|v| as_i32(&v)).unwrap_or_default()
    }

    fn get_i64(&self, key: &str) -> i64 {
        self.get(key).map(|v| as_i64(&v)).unwrap_or_default()
    }

    fn get_uint(&self, key: &str) -> u64 {
        self.get_u64(key)
    }

    fn get_u32(&self, key: &str) -> u32 {
        self.get(key).map(|v| as_u32(&v)).unwrap_or_default()
    }

    fn get_u64(&self, key: &str) -> u64 {
        self.get(key).map(|v| as_u64(&v)).unwrap_or_default()
    }

    fn get_f64(&self, key: &str) -> f64 {
        self.get(key).map(|v| as_f64(&v)).unwrap_or_default()
    }

    fn get_time(&self, key: &str) -> DateTime<FixedOffset> {
        self.get(key)
            .map(|v| as_time(&v))
            .unwrap_or_else(cast::zero_time)
    }

    fn get_duration(&self, key: &str) -> Duration {
        self.get(key).map(|v| as_duration(&v)).unwrap_or_default()
    }

    fn get_int_slice(&self, key: &str) -> Vec<i64> {
        self.get(key).map(|v| as_int_slice(&v)).unwrap_or_default()
    }

    fn get_string_slice(&self, key: &str) -> Vec<String> {
        self.get(key).map(|v| as_string_slice(&v)).unwrap_or_default()
    }

    fn get_string_map(&self, key: &str) -> Map<String, Value> {
        self.get(key).map(|v| as_string_map(&v)).unwrap_or_default()
    }

    fn get_string_map_string(&self, key: &str) -> HashMap<String, String> {
        self.get(key)
            .map(|v| as_string_map_string(&v))
            .unwrap_or_default()
    }

    fn get_string_map_string_slice(&self, key: &str) -> HashMap<String, Vec<String>> {
        self.get(key)
            .map(|v| as_string_map_string_slice(&v))
            .unwrap_or_default()
    }

    /// 读取容量配置，如 `1kb` 返回 1024
    fn get_size_in_bytes(&self, key: &str) -> u64 {
        self.get(key).map(|v| as_size_in_bytes(&v)).unwrap_or_default()
    }

    /// 键存在时返回存储的值，即使它恰好等于回退值
    fn default(&self, key: &str, default_value: Value) -> Value {
        self.get(key).unwrap_or(default_value)
    }

    fn default_string(&self, key: &str, default_value: &str) -> String {
        match self.get(key) {
            Some(v) => as_string(&v),
            None => default_value.to_string(),
        }
    }

    fn default_bool(&self, key: &str, default_value: bool) -> bool {
        self.get(key).map_or(default_value, |v| as_bool(&v))
    }

    fn default_int(&self, key: &str, default_value: i64) -> i64 {
        self.default_i64(key, default_value)
    }

    fn default_i32(&self, key: &str, default_value: i32) -> i32 {
        self.get(key).map_or(default_value, |v| as_i32(&v))
    }

    fn default_i64(&self, key: &str, default_value: i64) -> i64 {
        self.get(key).map_or(default_value, |v| as_i64(&v))
    }

    fn default_uint(&self, key: &str, default_value: u64) -> u64 {
        self.default_u64(key, default_value)
    }

    fn default_u32(&self, key: &str, default_value: u32) -> u32 {
        self.get(key).map_or(default_value, |v| as_u32(&v))
    }

    fn default_u64(&self, key: &str, default_value: u64) -> u64 {
        self.get(key).map_or(default_value, |v| as_u64(&v))
    }

    fn default_f64(&self, key: &str, default_value: f64) -> f64 {
        self.get(key).map_or(default_value, |v| as_f64(&v))
    }

    fn default_time(&self, key: &str, default_value: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        self.get(key).map_or(default_value, |v| as_time(&v))
    }

    fn default_duration(&self, key: &str, default_value: Duration) -> Duration {
        self.get(key).map_or(default_value, |v| as_duration(&v))
    }

    fn default_int_slice(&self, key: &str, default_value: Vec<i64>) -> Vec<i64> {
        self.get(key).map_or(default_value, |v| as_int_slice(&v))
    }

    fn default_string_slice(&self, key: &str, default_value: Vec<String>) -> Vec<String> {
        self.get(key).map_or(default_value, |v| as_string_slice(&v))
    }

    fn default_string_map(&self, key: &str, default_value: Map<String, Value>) -> Map<String, Value> {
        self.get(key).map_or(default_value, |v| as_string_map(&v))
    }

    fn default_string_map_string(
        &self,
        key: &str,
        default_value: HashMap<String, String>,
    ) -> HashMap<String, String> {
        self.get(key).map_or(default_value, |v| as_string_map_string(&v))
    }

    fn default_string_map_string_slice(
        &self,
        key: &str,
        default_value: HashMap<String, Vec<String>>,
    ) -> HashMap<String, Vec<String>> {
        self.get(key)
            .map_or(default_value, |v| as_string_map_string_slice(&v))
    }

    fn default_size_in_bytes(&self, key: &str, default_value: u64) -> u64 {
        self.get(key).map_or(default_value, |v| as_size_in_bytes(&v))
    }
}

// 已取到的原始值到目标类型的转换，无法转换时为零值

fn as_string(v: &Value) -> String {
    cast::to_string(v).unwrap_or_default()
}

fn as_bool(v: &Value) -> bool {
    cast::to_bool(v).unwrap_or_default()
}

fn as_i32(v: &Value) -> i32 {
    cast::to_i64(v)
        .and_then(|i| i32::try_from(i).ok())
        .unwrap_or_default()
}

fn as_i64(v: &Value) -> i64 {
    cast::to_i64(v).unwrap_or_default()
}

fn as_u32(v: &Value) -> u32 {
    cast::to_u64(v)
        .and_then(|u| u32::try_from(u).ok())
        .unwrap_or_default()
}

fn as_u64(v: &Value) -> u64 {
    cast::to_u64(v).unwrap_or_default()
}

fn as_f64(v: &Value) -> f64 {
    cast::to_f64(v).unwrap_or_default()
}

fn as_time(v: &Value) -> DateTime<FixedOffset> {
    cast::to_time(v).unwrap_or_else(cast::zero_time)
}

fn as_duration(v: &Value) -> Duration {
    cast::to_duration(v).unwrap_or_default()
}

fn as_int_slice(v: &Value) -> Vec<i64> {
    cast::to_int_slice(v).unwrap_or_default()
}

fn as_string_slice(v: &Value) -> Vec<String> {
    cast::to_string_slice(v).unwrap_or_default()
}

fn as_string_map(v: &Value) -> Map<String, Value> {
    cast::to_string_map(v).unwrap_or_default()
}

fn as_string_map_string(v: &Value) -> HashMap<String, String> {
    cast::to_string_map_string(v).unwrap_or_default()
}

fn as_string_map_string_slice(v: &Value) -> HashMap<String, Vec<String>> {
    cast::to_string_map_string_slice(v).unwrap_or_default()
}

fn as_size_in_bytes(v: &Value) -> u64 {
    cast::to_size_in_bytes(v).unwrap_or_default()
}
