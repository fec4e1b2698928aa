//! 配置管理模块
//!
//! 提供多源配置的名称解析、文件解析、聚合存储、结构化解码和热重载功能

pub mod accessor;
pub mod cast;
pub mod decode;
pub mod descriptor;
pub mod loader;
pub mod manager;
pub mod options;
mod pipeline;
pub mod resolver;
pub mod store;
mod watcher;

// 重新导出主要类型
pub use accessor::ConfigReader;
pub use decode::DEFAULT_TAG_NAME;
pub use descriptor::{BoundTarget, Listener, SourceDescriptor};
pub use loader::{FormatLoader, SourceLoader};
pub use manager::ConfigHub;
pub use options::HubOptions;
pub use resolver::{NameResolver, ResolvedName, DEFAULT_CONFIG_TYPE};
pub use store::{EnvOverlay, SourceStore};
