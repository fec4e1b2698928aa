//! confhub 主程序入口
//!
//! 多源配置聚合与热重载工具

use anyhow::{Context, Result};
use clap::Parser;
use confhub::cli::args::{Args, Commands};
use confhub::cli::commands::{Command, ShowCommand, VersionCommand, WatchCommand};
use confhub::logging::{LogConfig, LoggingSystem};
use std::sync::Arc;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = LogConfig {
        level: args.log_level.clone().into(),
        console: true,
        json_format: args.json_logs,
        ..Default::default()
    };

    let logging = Arc::new(LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?);

    debug!("confhub v{} 启动", confhub::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args, logging).await {
        error!("命令执行失败: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args, logging: Arc<LoggingSystem>) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Show { .. } => Box::new(ShowCommand),
        Commands::Watch { .. } => Box::new(WatchCommand::new(logging)),
        Commands::Version { .. } => Box::new(VersionCommand),
    };
    command.execute(args).await
}
