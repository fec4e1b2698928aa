//! confhub - 多源配置聚合与热重载
//!
//! 把多个按逻辑名称注册的配置文件聚合到同一个命名空间，支持：
//! - YAML / JSON / TOML 配置文件
//! - 文件变更自动重载
//! - 重载后解码到调用方持有的结构
//! - 重载失败通知（内置飞书机器人）
//!
//! ```no_run
//! use confhub::{ConfigHub, ConfigReader};
//!
//! let hub = ConfigHub::new("./configs", &["server", "client.json"]);
//! hub.load()?;
//! let port = hub.get_int("server.http.port");
//! # Ok::<(), confhub::ConfigError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod notification;

// 重新导出主要类型
pub use config::{BoundTarget, ConfigHub, ConfigReader, HubOptions, SourceDescriptor, SourceStore};
pub use error::{ConfigError, NotificationError, SourceError};
pub use notification::{FeishuBotHook, NoOpNotification, Notification};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
