//! 配置管理器模块
//!
//! `ConfigHub` 把多个按逻辑名称注册的配置源聚合到同一个命名空间，
//! 负责初始加载、文件监控和失败通知的分发。

use crate::config::accessor::ConfigReader;
use crate::config::descriptor::{BoundTarget, SourceDescriptor};
use crate::config::loader::SourceLoader;
use crate::config::options::HubOptions;
use crate::config::pipeline;
use crate::config::resolver::NameResolver;
use crate::config::store::SourceStore;
use crate::config::watcher::{self, NotificationList};
use crate::error::{ConfigError, Result};
use crate::notification::Notification;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 多源配置管理器
pub struct ConfigHub {
    /// 聚合存储，每个配置源挂在自己的逻辑名称下
    aggregate: Arc<SourceStore>,
    /// 已注册的配置源，顺序即加载顺序
    descriptors: RwLock<Vec<Arc<SourceDescriptor>>>,
    /// 失败通知接收方
    notifications: NotificationList,
    /// 名称解析器
    resolver: NameResolver,
    /// 配置源共用的文件加载器
    loader: SourceLoader,
    /// 正在运行的监控任务
    watches: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for ConfigHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHub")
            .field("resolver", &self.resolver)
            .field("descriptors", &*self.descriptors.read())
            .field("notifications", &self.notifications.read().len())
            .field("watching", &self.is_watching())
            .finish()
    }
}

impl ConfigHub {
    /// 创建管理器并注册配置名称
    ///
    /// # 参数
    /// * `base_dir` - 配置文件所在目录
    /// * `names` - 配置名称，如 `server`、`client.json`
    pub fn new<P, S>(base_dir: P, names: &[S]) -> Self
    where
        P: Into<PathBuf>,
        S: AsRef<str>,
    {
        let hub = Self::with_options(HubOptions::new().with_base_dir(base_dir));
        hub.register(names);
        hub
    }

    /// 使用选项创建管理器
    pub fn with_options(options: HubOptions) -> Self {
        let aggregate = SourceStore::new();
        if options.automatic_env {
            aggregate.env().enable();
        }
        aggregate.env().set_allow_empty(options.allow_empty_env);

        Self {
            aggregate: Arc::new(aggregate),
            descriptors: RwLock::new(Vec::new()),
            notifications: Arc::new(RwLock::new(options.notifications)),
            resolver: NameResolver::new(options.base_dir, options.default_type),
            loader: SourceLoader::new(options.env_substitution),
            watches: Mutex::new(Vec::new()),
        }
    }

    /// 注册一组配置名称，已注册的名称保持不变
    pub fn register<S: AsRef<str>>(&self, names: &[S]) {
        for name in names {
            self.register_name(name.as_ref());
        }
    }

    /// 注册单个配置名称并返回对应的配置源
    ///
    /// 逻辑名称已存在时（不区分大小写）直接返回已有的配置源。
    pub fn register_name(&self, name: &str) -> Arc<SourceDescriptor> {
        let resolved = self.resolver.resolve(name);
        let mut descriptors = self.descriptors.write();

        if let Some(existing) = descriptors
            .iter()
            .find(|d| same_name(d.logical_name(), &resolved.logical_name))
        {
            return Arc::clone(existing);
        }

        debug!(
            "注册配置 [{}]: 类型 {}，文件 {}",
            resolved.logical_name,
            resolved.source_type,
            resolved.file_path.display()
        );
        let descriptor = Arc::new(SourceDescriptor::new(resolved, self.loader.clone()));
        descriptors.push(Arc::clone(&descriptor));
        descriptor
    }

    /// 设置变更回调，覆盖之前的回调
    ///
    /// 回调在每次成功加载或重载后以该配置源自身的存储调用。
    pub fn on_change<F>(&self, name: &str, listener: F) -> Arc<SourceDescriptor>
    where
        F: Fn(&SourceStore) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let descriptor = self.register_name(name);
        descriptor.set_listener(Arc::new(listener));
        descriptor
    }

    /// 绑定目标结构，使用默认的 `json` 标签约定
    pub fn bind<B>(&self, name: &str, target: B) -> Arc<SourceDescriptor>
    where
        B: BoundTarget + 'static,
    {
        self.bind_with_tag(name, target, crate::config::decode::DEFAULT_TAG_NAME)
    }

    /// 绑定目标结构并指定标签约定
    ///
    /// 目标类型与配置内容是否匹配只在解码时检查。解码按 serde 严格匹配类型，
    /// 字符串形式的数字或时长需要在字段上使用 [`decode::lenient`](crate::config::decode::lenient)。
    pub fn bind_with_tag<B>(&self, name: &str, target: B, tag_name: &str) -> Arc<SourceDescriptor>
    where
        B: BoundTarget + 'static,
    {
        let descriptor = self.register_name(name);
        descriptor.set_binding(Arc::new(target), tag_name);
        descriptor
    }

    /// 追加失败通知接收方
    pub fn register_notification<I>(&self, notifications: I)
    where
        I: IntoIterator<Item = Arc<dyn Notification>>,
    {
        self.notifications.write().extend(notifications);
    }

    /// 按逻辑名称查找配置源
    pub fn descriptor(&self, logical_name: &str) -> Option<Arc<SourceDescriptor>> {
        self.descriptors
            .read()
            .iter()
            .find(|d| same_name(d.logical_name(), logical_name))
            .cloned()
    }

    /// 按注册顺序返回所有配置源
    pub fn descriptors(&self) -> Vec<Arc<SourceDescriptor>> {
        self.descriptors.read().clone()
    }

    /// 启用自动环境变量覆盖
    pub fn automatic_env(&self) {
        self.aggregate.env().enable();
    }

    pub fn allow_empty_env(&self, allow_empty: bool) {
        self.aggregate.env().set_allow_empty(allow_empty);
    }

    /// 聚合存储
    pub fn aggregate(&self) -> &SourceStore {
        &self.aggregate
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    /// 按注册顺序加载所有配置源
    ///
    /// 遇到第一个错误立即返回，后续配置源不再处理。
    pub fn load(&self) -> Result<()> {
        for descriptor in self.descriptors() {
            pipeline::reload(&self.aggregate, &descriptor)?;
            info!(
                "配置 [{}] 加载完成: {}",
                descriptor.logical_name(),
                descriptor.file_path().display()
            );
        }
        Ok(())
    }

    /// 为每个配置源启动文件监控
    ///
    /// 需要在 [`load`](Self::load) 之后、tokio 运行时之内调用。重复调用会先停止
    /// 已有的监控再重新启动。监控器创建失败不会在这里返回，而是发送给通知接收方。
    pub fn watch(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let mut watches = self.watches.lock();
        for handle in watches.drain(..) {
            handle.abort();
        }

        for descriptor in self.descriptors() {
            watches.push(watcher::spawn_watch(
                &runtime,
                Arc::clone(&self.aggregate),
                descriptor,
                Arc::clone(&self.notifications),
            ));
        }
        Ok(())
    }

    /// 停止所有文件监控
    pub fn unwatch(&self) {
        let mut watches = self.watches.lock();
        if watches.is_empty() {
            return;
        }
        for handle in watches.drain(..) {
            handle.abort();
        }
        info!("配置文件监控已停止");
    }

    pub fn is_watching(&self) -> bool {
        self.watches.lock().iter().any(|handle| !handle.is_finished())
    }
}

impl ConfigReader for ConfigHub {
    fn get(&self, key: &str) -> Option<Value> {
        self.aggregate.get(key)
    }

    fn all_settings(&self) -> Map<String, Value> {
        self.aggregate.all_settings()
    }
}

impl Drop for ConfigHub {
    fn drop(&mut self) {
        self.unwatch();
    }
}

/// 逻辑名称比较不区分大小写，与聚合存储的键一致
fn same_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}
