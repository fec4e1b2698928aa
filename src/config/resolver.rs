//! 配置名称解析
//!
//! 把用户传入的短名称解析为逻辑名称、配置类型和文件路径

use std::path::{Path, PathBuf};

/// 默认配置类型
pub const DEFAULT_CONFIG_TYPE: &str = "yaml";

/// 名称解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// 逻辑名称，同时作为聚合命名空间
    pub logical_name: String,
    /// 配置类型（小写扩展名）
    pub source_type: String,
    /// 配置文件路径
    pub file_path: PathBuf,
}

/// 名称解析器
#[derive(Debug, Clone)]
pub struct NameResolver {
    /// 相对名称的基准目录
    base_dir: PathBuf,
    /// 无扩展名时使用的配置类型
    default_type: String,
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new(".", DEFAULT_CONFIG_TYPE)
    }
}

impl NameResolver {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(base_dir: P, default_type: S) -> Self {
        Self {
            base_dir: base_dir.into(),
            default_type: default_type.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn default_type(&self) -> &str {
        &self.default_type
    }

    /// 解析名称
    ///
    /// - `log.toml` 解析为 (`log`, `toml`, `<base>/log.toml`)
    /// - `server` 解析为 (`server`, 默认类型, `<base>/server.<默认类型>`)
    ///
    /// 解析是纯字符串处理，不会失败；不支持的类型在读取文件时才会报错。
    pub fn resolve(&self, name: &str) -> ResolvedName {
        let path = Path::new(name);
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty());

        match (extension, path.file_stem().and_then(|stem| stem.to_str())) {
            (Some(ext), Some(stem)) => ResolvedName {
                logical_name: stem.to_string(),
                source_type: ext.to_ascii_lowercase(),
                file_path: self.base_dir.join(name),
            },
            _ => {
                let name = name.trim_end_matches('.');
                ResolvedName {
                    logical_name: name.to_string(),
                    source_type: self.default_type.clone(),
                    file_path: self
                        .base_dir
                        .join(format!("{}.{}", name, self.default_type)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_without_extension() {
        let resolver = NameResolver::new("/test/path", "yaml");
        let resolved = resolver.resolve("config1");

        assert_eq!(resolved.logical_name, "config1");
        assert_eq!(resolved.source_type, "yaml");
        assert_eq!(resolved.file_path, PathBuf::from("/test/path/config1.yaml"));
    }

    #[test]
    fn test_resolve_with_extension() {
        let resolver = NameResolver::new("/test/path", "yaml");
        let resolved = resolver.resolve("config3.json");

        assert_eq!(resolved.logical_name, "config3");
        assert_eq!(resolved.source_type, "json");
        assert_eq!(resolved.file_path, PathBuf::from("/test/path/config3.json"));
    }

    #[test]
    fn test_resolve_lowercases_extension() {
        let resolver = NameResolver::default();
        let resolved = resolver.resolve("Database.TOML");

        assert_eq!(resolved.logical_name, "Database");
        assert_eq!(resolved.source_type, "toml");
        assert_eq!(resolved.file_path, PathBuf::from("./Database.TOML"));
    }

    #[test]
    fn test_resolve_uses_configured_default_type() {
        for default_type in ["json", "yml", "toml"] {
            let resolver = NameResolver::new(".", default_type);
            let resolved = resolver.resolve("app");
            assert_eq!(resolved.source_type, default_type);
            assert_eq!(
                resolved.file_path,
                PathBuf::from(format!("./app.{default_type}"))
            );
            assert!(crate::config::loader::loader_for(&resolved.source_type).is_ok());
        }
    }

    #[test]
    fn test_resolve_nested_name() {
        let resolver = NameResolver::new("/etc/app", "yaml");

        let resolved = resolver.resolve("conf.d/log.toml");
        assert_eq!(resolved.logical_name, "log");
        assert_eq!(resolved.file_path, PathBuf::from("/etc/app/conf.d/log.toml"));

        let resolved = resolver.resolve("conf.d/server");
        assert_eq!(resolved.logical_name, "conf.d/server");
        assert_eq!(resolved.source_type, "yaml");
        assert_eq!(
            resolved.file_path,
            PathBuf::from("/etc/app/conf.d/server.yaml")
        );
    }

    #[test]
    fn test_resolve_trailing_dot() {
        let resolver = NameResolver::new("/cfg", "yaml");
        let resolved = resolver.resolve("app.");

        assert_eq!(resolved.logical_name, "app");
        assert_eq!(resolved.file_path, PathBuf::from("/cfg/app.yaml"));
    }
}
