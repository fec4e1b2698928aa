//! 值类型转换
//!
//! 对键值树中的值做尽力而为的类型转换，无法转换时返回 `None`，
//! 由读取接口决定回退到零值。

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

pub fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim() {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
            _ => None,
        },
        Value::Null => Some(false),
        _ => None,
    }
}

pub fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => parse_int(s),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Null => Some(0),
        _ => None,
    }
}

pub fn to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        _ => to_i64(value).and_then(|i| u64::try_from(i).ok()),
    }
}

pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        _ => None,
    }
}

/// 整数解析，支持 `0x` / `0o` / `0b` 前缀以及小数部分为零的浮点写法
///
/// 最多一个符号位，超出 `i64` 范围的值视为无法解析。
fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if digits.starts_with(['+', '-']) {
        return None;
    }

    let magnitude: i128 = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        parse_radix(hex, 16)?
    } else if let Some(oct) = digits.strip_prefix("0o").or_else(|| digits.strip_prefix("0O")) {
        parse_radix(oct, 8)?
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        parse_radix(bin, 2)?
    } else {
        match digits.parse::<i128>() {
            Ok(i) => i,
            Err(_) => digits
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i128::MAX as f64)
                .map(|f| f as i128)?,
        }
    };

    let value = if negative { magnitude.checked_neg()? } else { magnitude };
    i64::try_from(value).ok()
}

/// 无符号的进制数字串
fn parse_radix(digits: &str, radix: u32) -> Option<i128> {
    if digits.starts_with(['+', '-']) {
        return None;
    }
    i128::from_str_radix(digits, radix).ok()
}

/// 时长转换
///
/// 整数按纳秒解释，字符串支持 `1h30m`、`500ms`、`2.5s` 这类写法。
pub fn to_duration(value: &Value) -> Option<Duration> {
    match value {
        Value::Number(n) => {
            if let Some(nanos) = n.as_u64() {
                Some(Duration::from_nanos(nanos))
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| Duration::from_nanos(f as u64))
            }
        }
        Value::String(s) => parse_duration(s),
        Value::Null => Some(Duration::ZERO),
        _ => None,
    }
}

/// 解析 `72h3m0.5s` 形式的时长字符串，纯数字按纳秒处理
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok().map(Duration::from_nanos);
    }

    let mut rest = s.strip_prefix('+').unwrap_or(s);
    if rest.starts_with('-') {
        return None;
    }
    if rest == "0" {
        return Some(Duration::ZERO);
    }

    let mut total_nanos: f64 = 0.0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_end == 0 {
            return None;
        }
        let number: f64 = rest[..number_end].parse().ok()?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_nanos = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            _ => return None,
        };
        rest = &rest[unit_end..];
        total_nanos += number * unit_nanos;
    }

    Some(Duration::from_nanos(total_nanos.round() as u64))
}

/// 时间零值
pub fn zero_time() -> DateTime<FixedOffset> {
    DateTime::<Utc>::UNIX_EPOCH.fixed_offset()
}

/// 时间转换
///
/// 支持 RFC 3339、常见的日期时间写法和 Unix 秒级时间戳，无时区信息时按 UTC 处理。
pub fn to_time(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::String(s) => parse_time(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .map(|dt| dt.fixed_offset()),
        _ => None,
    }
}

fn parse_time(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

pub fn to_string_slice(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| to_string(item).unwrap_or_default())
                .collect(),
        ),
        Value::String(s) => Some(s.split_whitespace().map(str::to_string).collect()),
        _ => None,
    }
}

pub fn to_int_slice(value: &Value) -> Option<Vec<i64>> {
    match value {
        Value::Array(items) => items.iter().map(to_i64).collect(),
        _ => None,
    }
}

pub fn to_string_map(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(s) => match serde_json::from_str(s) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

pub fn to_string_map_string(value: &Value) -> Option<HashMap<String, String>> {
    to_string_map(value).map(|map| {
        map.iter()
            .map(|(k, v)| (k.clone(), to_string(v).unwrap_or_default()))
            .collect()
    })
}

pub fn to_string_map_string_slice(value: &Value) -> Option<HashMap<String, Vec<String>>> {
    to_string_map(value).map(|map| {
        map.iter()
            .map(|(k, v)| {
                let items = match v {
                    Value::String(s) => vec![s.clone()],
                    other => to_string_slice(other).unwrap_or_default(),
                };
                (k.clone(), items)
            })
            .collect()
    })
}

/// 解析 `1kb`、`5 MB`、`2g` 这类容量写法，倍数为 1024
pub fn parse_size_in_bytes(s: &str) -> u64 {
    let mut size = s.trim();
    let mut multiplier: u64 = 1;

    let bytes = size.as_bytes();
    if bytes.len() > 2 && matches!(bytes[bytes.len() - 1], b'b' | b'B') {
        let last = bytes.len() - 1;
        multiplier = match bytes[last - 1].to_ascii_lowercase() {
            b'k' => 1 << 10,
            b'm' => 1 << 20,
            b'g' => 1 << 30,
            _ => 1,
        };
        size = if multiplier == 1 {
            size[..last].trim()
        } else {
            size[..last - 1].trim()
        };
    }

    let value = parse_int(size).unwrap_or(0).max(0) as u64;
    value.saturating_mul(multiplier)
}

pub fn to_size_in_bytes(value: &Value) -> Option<u64> {
    to_string(value).map(|s| parse_size_in_bytes(&s))
}
