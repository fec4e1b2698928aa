//! 配置源描述
//!
//! 每个逻辑名称对应一个 `SourceDescriptor`，其中包含该配置源的私有存储、
//! 解析后的文件信息、可选的绑定目标以及可选的变更回调。

use crate::config::decode::DEFAULT_TAG_NAME;
use crate::config::loader::SourceLoader;
use crate::config::resolver::ResolvedName;
use crate::config::store::SourceStore;
use crate::error::SourceError;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 变更回调，每次成功重载后以配置源自身的存储调用
pub type Listener = Arc<dyn Fn(&SourceStore) -> anyhow::Result<()> + Send + Sync>;

/// 绑定目标trait
///
/// 由调用方持有的共享结构，每次重载后用配置源的内容重新解码并整体替换。
pub trait BoundTarget: Send + Sync {
    fn decode_from(&self, store: &SourceStore, tag_name: &str) -> Result<(), SourceError>;
}

impl<T> BoundTarget for Arc<RwLock<T>>
where
    T: DeserializeOwned + Send + Sync,
{
    fn decode_from(&self, store: &SourceStore, tag_name: &str) -> Result<(), SourceError> {
        let value = store.unmarshal::<T>(tag_name)?;
        *self.write() = value;
        Ok(())
    }
}

impl<T> BoundTarget for Arc<std::sync::RwLock<T>>
where
    T: DeserializeOwned + Send + Sync,
{
    fn decode_from(&self, store: &SourceStore, tag_name: &str) -> Result<(), SourceError> {
        let value = store.unmarshal::<T>(tag_name)?;
        // 忽略锁中毒
        let mut guard = self.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = value;
        Ok(())
    }
}

/// 绑定信息
#[derive(Clone)]
pub(crate) struct Binding {
    pub(crate) target: Arc<dyn BoundTarget>,
    pub(crate) tag_name: String,
}

/// 配置源描述
pub struct SourceDescriptor {
    /// 逻辑名称，既是注册键也是聚合命名空间
    logical_name: String,
    /// 配置类型
    source_type: String,
    /// 配置文件路径
    file_path: PathBuf,
    /// 私有存储，与聚合存储相互独立
    store: SourceStore,
    /// 绑定目标
    binding: RwLock<Option<Binding>>,
    /// 变更回调
    listener: RwLock<Option<Listener>>,
}

impl std::fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("logical_name", &self.logical_name)
            .field("source_type", &self.source_type)
            .field("file_path", &self.file_path)
            .field("tag_name", &self.tag_name())
            .field("bound", &self.is_bound())
            .field("has_listener", &self.has_listener())
            .finish()
    }
}

impl SourceDescriptor {
    pub(crate) fn new(resolved: ResolvedName, loader: SourceLoader) -> Self {
        let store = SourceStore::for_file(&resolved.source_type, &resolved.file_path, loader);
        Self {
            logical_name: resolved.logical_name,
            source_type: resolved.source_type,
            file_path: resolved.file_path,
            store,
            binding: RwLock::new(None),
            listener: RwLock::new(None),
        }
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn store(&self) -> &SourceStore {
        &self.store
    }

    /// 解码使用的标签约定，未绑定时为默认值
    pub fn tag_name(&self) -> String {
        self.binding
            .read()
            .as_ref()
            .map(|binding| binding.tag_name.clone())
            .unwrap_or_else(|| DEFAULT_TAG_NAME.to_string())
    }

    pub fn is_bound(&self) -> bool {
        self.binding.read().is_some()
    }

    pub fn has_listener(&self) -> bool {
        self.listener.read().is_some()
    }

    pub(crate) fn set_binding(&self, target: Arc<dyn BoundTarget>, tag_name: &str) {
        *self.binding.write() = Some(Binding {
            target,
            tag_name: tag_name.to_string(),
        });
    }

    pub(crate) fn set_listener(&self, listener: Listener) {
        *self.listener.write() = Some(listener);
    }

    pub(crate) fn binding(&self) -> Option<Binding> {
        self.binding.read().clone()
    }

    pub(crate) fn listener(&self) -> Option<Listener> {
        self.listener.read().clone()
    }
}
