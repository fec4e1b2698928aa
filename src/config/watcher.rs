//! 配置文件监控模块
//!
//! 每个配置源一个文件系统监控器和一个处理任务。监控器挂在配置文件所在目录上，
//! 事件经通道送入任务，任务按顺序为每个事件执行一次重载流水线。

use crate::config::descriptor::SourceDescriptor;
use crate::config::pipeline;
use crate::config::store::SourceStore;
use crate::error::ConfigError;
use crate::notification::{notify_all, Notification};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 通知接收方列表，失败时取快照后依次调用
pub(crate) type NotificationList = Arc<RwLock<Vec<Arc<dyn Notification>>>>;

/// 启动单个配置源的监控
///
/// 监控器在返回前已经就绪，之后对文件的修改不会丢失。
/// 监控器创建失败时记录日志，并把 `Watch` 错误发送给所有通知接收方。
pub(crate) fn spawn_watch(
    runtime: &Handle,
    aggregate: Arc<SourceStore>,
    descriptor: Arc<SourceDescriptor>,
    notifications: NotificationList,
) -> JoinHandle<()> {
    let (tx, rx) = mpsc::unbounded_channel();

    match arm_watcher(descriptor.file_path(), tx) {
        Ok(watcher) => {
            info!(
                "开始监控配置 [{}]: {}",
                descriptor.logical_name(),
                descriptor.file_path().display()
            );
            runtime.spawn(handle_file_events(watcher, rx, aggregate, descriptor, notifications))
        }
        Err(e) => {
            error!("监控配置 [{}] 失败: {}", descriptor.logical_name(), e);
            let name = descriptor.logical_name().to_string();
            let err = ConfigError::Watch {
                name: name.clone(),
                message: e.to_string(),
            };
            runtime.spawn(async move {
                let snapshot = notifications.read().clone();
                notify_all(&snapshot, &name, &err).await;
            })
        }
    }
}

/// 创建监控器并挂到配置文件所在目录
fn arm_watcher(
    config_path: &Path,
    tx: mpsc::UnboundedSender<notify::Result<Event>>,
) -> notify::Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // 接收端关闭说明监控已停止
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )?;

    watcher.watch(watch_dir(config_path), RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// 监控目录，相对文件名的父目录为当前目录
fn watch_dir(config_path: &Path) -> &Path {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// 处理文件系统事件
///
/// 任务持有监控器，任务结束或被中止时监控器随之释放。
async fn handle_file_events(
    _watcher: RecommendedWatcher,
    mut rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    aggregate: Arc<SourceStore>,
    descriptor: Arc<SourceDescriptor>,
    notifications: NotificationList,
) {
    while let Some(res) = rx.recv().await {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                warn!("配置 [{}] 文件监控事件错误: {}", descriptor.logical_name(), e);
                continue;
            }
        };

        if !is_target_file_event(&event, descriptor.file_path()) {
            continue;
        }
        debug!("检测到配置 [{}] 变更事件: {:?}", descriptor.logical_name(), event.kind);

        let aggregate_ref = Arc::clone(&aggregate);
        let descriptor_ref = Arc::clone(&descriptor);
        let result = tokio::task::spawn_blocking(move || pipeline::reload(&aggregate_ref, &descriptor_ref)).await;

        match result {
            Ok(Ok(())) => info!("配置 [{}] 重载成功", descriptor.logical_name()),
            Ok(Err(err)) => {
                error!("配置 [{}] 重载失败: {}", descriptor.logical_name(), err);
                let snapshot = notifications.read().clone();
                notify_all(&snapshot, descriptor.logical_name(), &err).await;
            }
            Err(e) => error!("配置 [{}] 重载任务异常结束: {}", descriptor.logical_name(), e),
        }
    }
}

/// 检查是否是目标文件的创建或内容变更事件
///
/// 只比较文件名，监控是非递归的，同目录下同名即同一文件。
pub(crate) fn is_target_file_event(event: &Event, target_path: &Path) -> bool {
    match &event.kind {
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) | EventKind::Create(_) => match target_path.file_name() {
            Some(target_name) => event
                .paths
                .iter()
                .any(|path| path.file_name() == Some(target_name)),
            None => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_is_target_file_event() {
        let target = Path::new("/etc/confhub/server.yaml");

        assert!(is_target_file_event(
            &event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), "/etc/confhub/server.yaml"),
            target
        ));
        assert!(is_target_file_event(
            &event(EventKind::Create(CreateKind::File), "./server.yaml"),
            target
        ));
        assert!(!is_target_file_event(
            &event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), "/etc/confhub/client.yaml"),
            target
        ));
        assert!(!is_target_file_event(
            &event(EventKind::Remove(RemoveKind::File), "/etc/confhub/server.yaml"),
            target
        ));
        assert!(!is_target_file_event(
            &event(EventKind::Access(AccessKind::Any), "/etc/confhub/server.yaml"),
            target
        ));
        assert!(!is_target_file_event(
            &event(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)), "/etc/confhub/server.yaml"),
            target
        ));
    }

    #[test]
    fn test_watch_dir() {
        assert_eq!(watch_dir(Path::new("/etc/confhub/server.yaml")), Path::new("/etc/confhub"));
        assert_eq!(watch_dir(Path::new("./server.yaml")), Path::new("."));
        assert_eq!(watch_dir(Path::new("server.yaml")), Path::new("."));
    }
}
