//! 管理器选项
//!
//! 以构建器方式设置基础目录、默认配置类型、失败通知和环境变量相关开关。

use crate::config::resolver::DEFAULT_CONFIG_TYPE;
use crate::notification::Notification;
use std::path::PathBuf;
use std::sync::Arc;

/// `ConfigHub` 的构建选项
#[derive(Clone)]
pub struct HubOptions {
    /// 配置文件所在目录
    pub(crate) base_dir: PathBuf,
    /// 名称不带扩展名时使用的配置类型
    pub(crate) default_type: String,
    /// 重载失败时的通知接收方
    pub(crate) notifications: Vec<Arc<dyn Notification>>,
    /// 是否启用自动环境变量覆盖
    pub(crate) automatic_env: bool,
    /// 空字符串环境变量是否视为已设置
    pub(crate) allow_empty_env: bool,
    /// 是否在解析前替换 `${VAR}`
    pub(crate) env_substitution: bool,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            default_type: DEFAULT_CONFIG_TYPE.to_string(),
            notifications: Vec::new(),
            automatic_env: false,
            allow_empty_env: false,
            env_substitution: false,
        }
    }
}

impl std::fmt::Debug for HubOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubOptions")
            .field("base_dir", &self.base_dir)
            .field("default_type", &self.default_type)
            .field("notifications", &self.notifications.len())
            .field("automatic_env", &self.automatic_env)
            .field("allow_empty_env", &self.allow_empty_env)
            .field("env_substitution", &self.env_substitution)
            .finish()
    }
}

impl HubOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置配置文件所在目录
    pub fn with_base_dir<P: Into<PathBuf>>(mut self, base_dir: P) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// 设置默认配置类型，如 `yaml`、`json`、`toml`
    pub fn with_default_type(mut self, default_type: &str) -> Self {
        self.default_type = default_type.trim_start_matches('.').to_ascii_lowercase();
        self
    }

    /// 追加一个失败通知接收方，按追加顺序调用
    pub fn with_notification(mut self, notification: Arc<dyn Notification>) -> Self {
        self.notifications.push(notification);
        self
    }

    pub fn with_automatic_env(mut self) -> Self {
        self.automatic_env = true;
        self
    }

    pub fn with_allow_empty_env(mut self, allow_empty: bool) -> Self {
        self.allow_empty_env = allow_empty;
        self
    }

    pub fn with_env_substitution(mut self, enabled: bool) -> Self {
        self.env_substitution = enabled;
        self
    }

    pub fn base_dir(&self) -> &std::path::Path {
        &self.base_dir
    }

    pub fn default_type(&self) -> &str {
        &self.default_type
    }
}
