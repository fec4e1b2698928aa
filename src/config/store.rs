//! 配置存储
//!
//! `SourceStore` 保存一棵解析后的键值树。每个配置源持有一个私有存储，
//! 管理器另外持有一个聚合存储，把各配置源的整棵树挂在各自的逻辑名称下。
//!
//! 读取时键名不区分大小写。通过 [`SourceStore::set`] 写入的键统一转为小写，
//! 从文件读入的树保留原样，解码时字段名按文件里的写法匹配。

use crate::config::accessor::ConfigReader;
use crate::config::decode;
use crate::config::loader::SourceLoader;
use crate::error::SourceError;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// 环境变量覆盖
///
/// 启用后，读取 `server.http-port` 会先查找环境变量 `SERVER_HTTP_PORT`。
#[derive(Debug, Default)]
pub struct EnvOverlay {
    /// 是否启用自动环境变量
    enabled: AtomicBool,
    /// 空字符串是否视为已设置
    allow_empty: AtomicBool,
}

impl EnvOverlay {
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn set_allow_empty(&self, allow_empty: bool) {
        self.allow_empty.store(allow_empty, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// 配置键对应的环境变量名
    pub fn env_key(key: &str) -> String {
        key.chars()
            .map(|c| match c {
                '.' | '-' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect()
    }

    fn lookup(&self, key: &str) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        let value = std::env::var(Self::env_key(key)).ok()?;
        if value.is_empty() && !self.allow_empty.load(Ordering::SeqCst) {
            return None;
        }
        Some(value)
    }
}

/// 单个配置源或聚合结果的键值存储
#[derive(Debug)]
pub struct SourceStore {
    /// 配置类型
    config_type: String,
    /// 配置文件路径，聚合存储没有文件
    config_file: Option<PathBuf>,
    /// 文件加载器
    loader: SourceLoader,
    /// 键值树
    tree: RwLock<Map<String, Value>>,
    /// 环境变量覆盖
    env: EnvOverlay,
}

impl Default for SourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceStore {
    /// 创建不关联文件的空存储
    pub fn new() -> Self {
        Self::from_map(Map::new())
    }

    /// 用已有的键值表创建存储
    pub fn from_map(tree: Map<String, Value>) -> Self {
        Self {
            config_type: String::new(),
            config_file: None,
            loader: SourceLoader::default(),
            tree: RwLock::new(tree),
            env: EnvOverlay::default(),
        }
    }

    /// 创建关联配置文件的存储，文件在 [`read_in_config`](Self::read_in_config) 时才读取
    pub fn for_file<P: Into<PathBuf>>(config_type: &str, config_file: P, loader: SourceLoader) -> Self {
        Self {
            config_type: config_type.to_string(),
            config_file: Some(config_file.into()),
            loader,
            tree: RwLock::new(Map::new()),
            env: EnvOverlay::default(),
        }
    }

    pub fn config_type(&self) -> &str {
        &self.config_type
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn env(&self) -> &EnvOverlay {
        &self.env
    }

    /// 重新读取并解析配置文件，成功后整体替换键值树
    pub fn read_in_config(&self) -> Result<(), SourceError> {
        let path = self.config_file.as_deref().ok_or_else(|| SourceError::FileNotFound {
            path: String::new(),
        })?;
        let table = self.loader.load_from_file(path, &self.config_type)?;
        *self.tree.write() = table;
        Ok(())
    }

    /// 在点分路径上写入值，整体替换该路径上原有的子树
    ///
    /// 路径和值中所有对象的键都转为小写；已有的大小写变体会被替换。
    pub fn set(&self, key: &str, value: Value) {
        let key = key.to_lowercase();
        let value = lowercase_keys(value);
        let mut tree = self.tree.write();
        let mut segments = key.split('.').peekable();
        let mut current: &mut Map<String, Value> = &mut tree;

        while let Some(segment) = segments.next() {
            adopt_case_variant(current, segment);
            if segments.peek().is_none() {
                current.insert(segment.to_string(), value);
                return;
            }
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                _ => return,
            };
        }
    }

    /// 按照标签约定把整棵树解码为目标类型
    pub fn unmarshal<T: DeserializeOwned>(&self, tag_name: &str) -> Result<T, SourceError> {
        let tree = self.tree.read();
        decode::decode_tree(&tree, tag_name)
    }

    /// 按照标签约定把某个子树解码为目标类型
    pub fn unmarshal_key<T: DeserializeOwned>(&self, key: &str, tag_name: &str) -> Result<T, SourceError> {
        match self.get(key) {
            Some(Value::Object(map)) => decode::decode_tree(&map, tag_name),
            Some(other) => decode::decode_value(other, tag_name),
            None => decode::decode_value(Value::Null, tag_name),
        }
    }
}

impl ConfigReader for SourceStore {
    fn get(&self, key: &str) -> Option<Value> {
        if key.is_empty() {
            return None;
        }
        if let Some(value) = self.env.lookup(key) {
            return Some(Value::String(value));
        }
        let tree = self.tree.read();
        lookup_path(&tree, key).filter(|v| !v.is_null()).cloned()
    }

    fn all_settings(&self) -> Map<String, Value> {
        self.tree.read().clone()
    }
}

/// 沿点分路径查找，键名不区分大小写
pub(crate) fn lookup_path<'a>(tree: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let mut current = child(tree, segments.next()?)?;
    for segment in segments {
        current = child(current.as_object()?, segment)?;
    }
    Some(current)
}

/// 先精确匹配，再忽略大小写匹配
fn child<'a>(map: &'a Map<String, Value>, segment: &str) -> Option<&'a Value> {
    map.get(segment).or_else(|| {
        let wanted = segment.to_lowercase();
        map.iter()
            .find(|(k, _)| k.to_lowercase() == wanted)
            .map(|(_, v)| v)
    })
}

/// 把大小写不同的同名键改写为小写键
fn adopt_case_variant(map: &mut Map<String, Value>, segment: &str) {
    if map.contains_key(segment) {
        return;
    }
    let variant = map.keys().find(|k| k.to_lowercase() == segment).cloned();
    if let Some(value) = variant.and_then(|k| map.remove(&k)) {
        map.insert(segment.to_string(), lowercase_keys(value));
    }
}

/// 递归地把对象键转为小写
fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), lowercase_keys(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_set_replaces_subtree() {
        let store = SourceStore::new();
        store.set("server", json!({"name": "a", "port": 1}));
        store.set("server", json!({"name": "b"}));

        assert_eq!(store.get("server.name"), Some(json!("b")));
        assert_eq!(store.get("server.port"), None);
    }

    #[test]
    fn test_set_nested_path() {
        let store = SourceStore::new();
        store.set("app.prod", json!({"debug": false}));
        store.set("app.dev", json!({"debug": true}));

        assert_eq!(store.get("app.prod.debug"), Some(json!(false)));
        assert_eq!(store.get("app.dev.debug"), Some(json!(true)));

        store.set("scalar", json!(1));
        store.set("scalar.child", json!(2));
        assert_eq!(store.get("scalar.child"), Some(json!(2)));
    }

    #[test]
    fn test_get_missing_and_null() {
        let store = SourceStore::from_map(
            json!({"a": {"b": null, "c": 1}})
                .as_object()
                .cloned()
                .unwrap(),
        );

        assert!(store.is_set("a.c"));
        assert!(!store.is_set("a.b"));
        assert!(!store.is_set("a.c.d"));
        assert!(!store.is_set(""));
    }

    #[test]
    fn test_read_in_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.yaml");
        fs::write(&path, "name: confhub\nhttp:\n  port: 8080\n").unwrap();

        let store = SourceStore::for_file("yaml", &path, SourceLoader::default());
        assert!(store.all_settings().is_empty());

        store.read_in_config().unwrap();
        assert_eq!(store.get_string("name"), "confhub");
        assert_eq!(store.get_int("http.port"), 8080);

        fs::write(&path, "name: renamed\n").unwrap();
        store.read_in_config().unwrap();
        assert_eq!(store.get_string("name"), "renamed");
        assert!(!store.is_set("http.port"));
    }

    #[test]
    fn test_set_lowercases_keys() {
        let store = SourceStore::new();
        store.set("Server", json!({"Name": "foo", "HTTP": {"Port": 1}}));

        assert_eq!(store.get_string("server.name"), "foo");
        assert_eq!(store.get_string("Server.Name"), "foo");
        assert_eq!(store.get_int("SERVER.http.PORT"), 1);
        assert_eq!(
            store.all_settings(),
            json!({"server": {"name": "foo", "http": {"port": 1}}})
                .as_object()
                .cloned()
                .unwrap()
        );

        store.set("server.NAME", json!("bar"));
        assert_eq!(store.get_string("server.name"), "bar");
        assert_eq!(store.all_settings()["server"].as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_set_replaces_case_variant() {
        let store = SourceStore::from_map(json!({"App": {"Level": "info"}}).as_object().cloned().unwrap());
        store.set("app.level", json!("debug"));

        assert_eq!(store.get_string("APP.LEVEL"), "debug");
        assert_eq!(store.all_settings().len(), 1);
        assert!(store.all_settings().contains_key("app"));
    }

    #[test]
    fn test_file_keys_keep_case_and_match_any_case() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Server.yaml");
        fs::write(&path, "Name: foo
listenPort: 8080
").unwrap();

        let store = SourceStore::for_file("yaml", &path, SourceLoader::default());
        store.read_in_config().unwrap();

        assert_eq!(store.get_string("name"), "foo");
        assert_eq!(store.get_string("NAME"), "foo");
        assert_eq!(store.get_int("listenport"), 8080);
        assert!(store.all_settings().contains_key("Name"));
    }

    #[test]
    fn test_read_in_config_failure_keeps_tree() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.yaml");
        fs::write(&path, "name: confhub\n").unwrap();

        let store = SourceStore::for_file("yaml", &path, SourceLoader::default());
        store.read_in_config().unwrap();

        fs::write(&path, "name: [unclosed\n").unwrap();
        assert!(store.read_in_config().is_err());
        assert_eq!(store.get_string("name"), "confhub");
    }

    #[test]
    fn test_env_key() {
        assert_eq!(EnvOverlay::env_key("server.http-port"), "SERVER_HTTP_PORT");
        assert_eq!(EnvOverlay::env_key("test_env"), "TEST_ENV");
    }

    #[test]
    #[serial]
    fn test_env_overlay() {
        std::env::set_var("CONFHUB_STORE_ENV", "test");
        std::env::set_var("CONFHUB_STORE_ENV_2", "");

        let store = SourceStore::new();
        assert_eq!(store.get("confhub_store_env"), None);

        store.env().enable();
        assert_eq!(store.get("confhub_store_env"), Some(json!("test")));
        assert_eq!(store.get("confhub_store_env_2"), None);
        assert_eq!(store.get("confhub_store_env_3"), None);

        store.env().set_allow_empty(true);
        assert_eq!(store.get("confhub_store_env_2"), Some(json!("")));

        std::env::remove_var("CONFHUB_STORE_ENV");
        std::env::remove_var("CONFHUB_STORE_ENV_2");
    }

    #[test]
    fn test_unmarshal_key() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Http {
            port: u16,
        }

        let store = SourceStore::new();
        store.set("server", json!({"http": {"port": 8080}}));

        let http: Http = store.unmarshal_key("server.http", "json").unwrap();
        assert_eq!(http, Http { port: 8080 });
    }
}
