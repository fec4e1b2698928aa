//! 错误处理模块
//!
//! 定义配置聚合、重载流水线和通知的统一错误类型

use thiserror::Error;

/// 重载流水线的错误类型
///
/// 每个变体都携带出错配置的逻辑名称，加载和监听两条路径产生的错误形态一致。
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 读取或解析配置文件失败
    #[error("读取配置 [{name}] 失败: {source}")]
    Read {
        name: String,
        #[source]
        source: SourceError,
    },

    /// 解码到绑定结构失败
    #[error("解码配置 [{name}] 失败: {source}")]
    Decode {
        name: String,
        #[source]
        source: SourceError,
    },

    /// 用户变更回调返回错误
    #[error("配置 [{name}] 变更回调失败: {source}")]
    Listener {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// 文件监听启动失败
    #[error("监听配置 [{name}] 失败: {message}")]
    Watch { name: String, message: String },

    /// 当前线程没有可用的 tokio 运行时
    #[error("监听配置需要在 tokio 运行时中调用")]
    NoRuntime,
}

impl ConfigError {
    /// 出错配置的逻辑名称
    pub fn config_name(&self) -> Option<&str> {
        match self {
            Self::Read { name, .. }
            | Self::Decode { name, .. }
            | Self::Listener { name, .. }
            | Self::Watch { name, .. } => Some(name),
            Self::NoRuntime => None,
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    pub fn is_listener(&self) -> bool {
        matches!(self, Self::Listener { .. })
    }
}

/// 单个配置源的错误类型
#[derive(Error, Debug)]
pub enum SourceError {
    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 读取文件失败
    #[error("读取文件失败: {0}")]
    Io(#[from] std::io::Error),

    /// 文件内容不符合声明的格式
    #[error("{format} 解析失败: {message}")]
    Parse { format: String, message: String },

    /// 不支持的配置类型
    #[error("不支持的配置类型: {0}")]
    UnsupportedType(String),

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVar { var: String },

    /// 结构化解码失败
    #[error("按 {tag} 约定解码失败: {message}")]
    Decode { tag: String, message: String },

    /// 不认识的解码标签约定
    #[error("未知的解码标签: {0}")]
    UnknownTag(String),
}

/// 通知错误类型
#[derive(Error, Debug)]
pub enum NotificationError {
    /// 发送失败
    #[error("通知发送失败: {0}")]
    SendError(String),

    /// 模板渲染错误
    #[error("模板渲染失败: {0}")]
    TemplateError(String),

    /// 配置错误
    #[error("通知配置错误: {0}")]
    ConfigError(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ConfigError>;
