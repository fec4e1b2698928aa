//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{ConfigHub, ConfigReader, SourceStore};
use crate::error::ConfigError;
use crate::logging::LoggingSystem;
use crate::notification::{FeishuBotHook, Notification};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            let version_info = serde_json::json!({
                "name": crate::APP_NAME,
                "version": crate::VERSION,
                "description": crate::APP_DESCRIPTION
            });
            println!("{}", render_value(&version_info, format)?);
        }
        Ok(())
    }
}

/// 显示命令
pub struct ShowCommand;

#[async_trait]
impl Command for ShowCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Show { names, key, format } = &args.command {
            let hub = ConfigHub::with_options(args.hub_options());
            hub.register(names.as_slice());
            hub.load().context("加载配置失败")?;

            println!("{}", self.render(&hub, key.as_deref(), format)?);
        }
        Ok(())
    }
}

impl ShowCommand {
    /// 渲染聚合结果或单个键
    pub fn render(&self, hub: &ConfigHub, key: Option<&str>, format: &OutputFormat) -> Result<String> {
        let value = match key {
            Some(key) => hub
                .get(key)
                .with_context(|| format!("配置键不存在: {}", key))?,
            None => Value::Object(hub.all_settings()),
        };
        render_value(&value, format)
    }
}

/// 监控命令
pub struct WatchCommand {
    /// 用于记录重载结果
    logging: Arc<LoggingSystem>,
}

#[async_trait]
impl Command for WatchCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Watch {
            names,
            feishu_webhook,
            feishu_secret,
        } = &args.command
        {
            let hub = self.build_hub(args, names, feishu_webhook.as_deref(), feishu_secret.as_deref())?;
            hub.load().context("加载配置失败")?;
            hub.watch().context("启动配置监控失败")?;

            info!("正在监控 {} 个配置，按 Ctrl-C 退出", hub.descriptors().len());
            tokio::signal::ctrl_c().await.context("等待退出信号失败")?;

            hub.unwatch();
            info!("收到退出信号，停止监控");
        }
        Ok(())
    }
}

impl WatchCommand {
    pub fn new(logging: Arc<LoggingSystem>) -> Self {
        Self { logging }
    }

    /// 注册配置、变更回调和失败通知
    pub fn build_hub(
        &self,
        args: &Args,
        names: &[String],
        feishu_webhook: Option<&str>,
        feishu_secret: Option<&str>,
    ) -> Result<ConfigHub> {
        let hub = ConfigHub::with_options(args.hub_options());

        for name in names {
            let descriptor = hub.register_name(name);
            let logging = Arc::clone(&self.logging);
            let logical_name = descriptor.logical_name().to_string();
            hub.on_change(name, move |store: &SourceStore| {
                let details = format!("{} 个顶层键", store.all_settings().len());
                logging.reload_log(&logical_name, true, Some(&details));
                Ok(())
            });
        }

        let logging = Arc::clone(&self.logging);
        let log_failure = move |config_name: &str, err: &ConfigError| {
            logging.reload_log(config_name, false, Some(&err.to_string()));
        };
        let mut notifications: Vec<Arc<dyn Notification>> = vec![Arc::new(log_failure)];

        if let Some(url) = feishu_webhook {
            let mut hook = FeishuBotHook::new(url).context("创建飞书通知失败")?;
            if let Some(secret) = feishu_secret {
                hook = hook.with_secret(secret);
            }
            notifications.push(Arc::new(hook));
        }
        hub.register_notification(notifications);

        Ok(hub)
    }
}

/// 按输出格式序列化
fn render_value(value: &Value, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value).context("序列化JSON失败"),
        OutputFormat::Yaml => serde_yaml::to_string(value).context("序列化YAML失败"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn args(dir: &TempDir, rest: &[&str]) -> Args {
        let mut argv = vec!["confhub", "--dir", dir.path().to_str().unwrap()];
        argv.extend_from_slice(rest);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_show_render() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("server.yaml"), "name: confhub\nport: 8080\n").unwrap();

        let args = args(&dir, &["show", "server"]);
        let hub = ConfigHub::with_options(args.hub_options());
        hub.register(&["server"]);
        hub.load().unwrap();

        let command = ShowCommand;
        let all = command.render(&hub, None, &OutputFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&all).unwrap();
        assert_eq!(parsed["server"]["port"], 8080);

        let port = command.render(&hub, Some("server.port"), &OutputFormat::Yaml).unwrap();
        assert_eq!(port.trim(), "8080");

        assert!(command.render(&hub, Some("server.missing"), &OutputFormat::Json).is_err());
    }

    #[test]
    fn test_watch_build_hub() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("server.yaml"), "name: confhub\n").unwrap();

        let args = args(&dir, &["watch", "server", "client.json"]);
        let logging = Arc::new(LoggingSystem::new(LogConfig::default()));
        let command = WatchCommand::new(logging);

        let hub = command
            .build_hub(&args, &["server".to_string(), "client.json".to_string()], None, None)
            .unwrap();
        assert_eq!(hub.descriptors().len(), 2);
        assert!(hub.descriptor("server").unwrap().has_listener());
        assert!(hub.descriptor("client").unwrap().has_listener());

        assert!(command
            .build_hub(&args, &["server".to_string()], Some("not-a-url"), None)
            .is_err());
    }
}
