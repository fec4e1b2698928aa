//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::config::HubOptions;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// confhub - 多源配置聚合与热重载工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "confhub",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件目录
    #[arg(
        short,
        long,
        value_name = "DIR",
        default_value = ".",
        help = "配置文件目录",
        env = "CONFHUB_DIR",
        global = true
    )]
    pub dir: PathBuf,

    /// 默认配置类型
    #[arg(
        short = 't',
        long,
        value_name = "TYPE",
        default_value = "yaml",
        help = "名称不带扩展名时使用的配置类型",
        env = "CONFHUB_DEFAULT_TYPE",
        global = true
    )]
    pub default_type: String,

    /// 日志级别
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        help = "日志级别",
        env = "CONFHUB_LOG_LEVEL",
        global = true
    )]
    pub log_level: LogLevel,

    /// 是否输出JSON格式日志
    #[arg(long, help = "输出JSON格式日志", global = true)]
    pub json_logs: bool,

    /// 是否启用环境变量覆盖
    #[arg(short, long, help = "读取配置时优先使用同名环境变量", global = true)]
    pub env: bool,

    /// 是否替换配置文件中的 ${VAR}
    #[arg(long, help = "解析前替换配置文件中的 ${VAR}", global = true)]
    pub substitute_env: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 输出格式
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// JSON格式
    Json,
    /// YAML格式
    Yaml,
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 加载配置并输出聚合结果
    Show {
        /// 配置名称，如 server、client.json
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,

        /// 只输出指定键，如 server.http.port
        #[arg(short, long, value_name = "KEY")]
        key: Option<String>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// 加载配置并持续监控变更，直到收到 Ctrl-C
    Watch {
        /// 配置名称
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,

        /// 重载失败时通知的飞书机器人地址
        #[arg(long, value_name = "URL", env = "CONFHUB_FEISHU_WEBHOOK")]
        feishu_webhook: Option<String>,

        /// 飞书机器人签名密钥
        #[arg(long, value_name = "SECRET", env = "CONFHUB_FEISHU_SECRET", requires = "feishu_webhook")]
        feishu_secret: Option<String>,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
}

impl Args {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// 根据全局参数构建管理器选项
    pub fn hub_options(&self) -> HubOptions {
        let options = HubOptions::new()
            .with_base_dir(&self.dir)
            .with_default_type(&self.default_type)
            .with_env_substitution(self.substitute_env);

        if self.env {
            options.with_automatic_env()
        } else {
            options
        }
    }
}
