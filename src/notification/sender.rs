//! 失败通知trait
//!
//! 监听触发的重载失败时，管理器按注册顺序依次调用每个通知接收方。

use crate::error::ConfigError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// 失败通知trait
///
/// 只在重载失败时调用，成功的变更请使用变更回调。
#[async_trait]
pub trait Notification: Send + Sync {
    /// 发送失败通知
    ///
    /// # 参数
    /// * `config_name` - 出错配置的逻辑名称
    /// * `err` - 重载流水线返回的错误
    async fn notify(&self, config_name: &str, err: &ConfigError);
}

#[async_trait]
impl<F> Notification for F
where
    F: Fn(&str, &ConfigError) + Send + Sync,
{
    async fn notify(&self, config_name: &str, err: &ConfigError) {
        self(config_name, err)
    }
}

/// 空的通知实现（用于测试或禁用通知）
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpNotification;

#[async_trait]
impl Notification for NoOpNotification {
    async fn notify(&self, _config_name: &str, _err: &ConfigError) {}
}

/// 按顺序通知所有接收方，前一个完成后才调用下一个
pub async fn notify_all(notifications: &[Arc<dyn Notification>], config_name: &str, err: &ConfigError) {
    debug!("向 {} 个接收方发送配置 [{}] 的失败通知", notifications.len(), config_name);
    for notification in notifications {
        notification.notify(config_name, err).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn watch_error() -> ConfigError {
        ConfigError::Watch {
            name: "server".to_string(),
            message: "boom".to_string(),
        }
    }

    #[tokio::test]
    async fn test_notify_all_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));

        let first_calls = Arc::clone(&calls);
        let first = move |name: &str, _err: &ConfigError| {
            first_calls.lock().push(format!("first:{}", name));
        };
        let second_calls = Arc::clone(&calls);
        let second = move |name: &str, _err: &ConfigError| {
            second_calls.lock().push(format!("second:{}", name));
        };

        let notifications: Vec<Arc<dyn Notification>> =
            vec![Arc::new(first), Arc::new(NoOpNotification), Arc::new(second)];
        notify_all(&notifications, "server", &watch_error()).await;

        assert_eq!(*calls.lock(), vec!["first:server", "second:server"]);
    }

    #[tokio::test]
    async fn test_closure_receives_error() {
        let seen = Arc::new(Mutex::new(None));
        let captured = Arc::clone(&seen);
        let notification = move |_name: &str, err: &ConfigError| {
            *captured.lock() = err.config_name().map(str::to_string);
        };

        notification.notify("server", &watch_error()).await;
        assert_eq!(seen.lock().as_deref(), Some("server"));
    }
}
