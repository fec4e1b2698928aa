//! 日志系统模块
//!
//! 提供结构化日志配置和初始化功能

use log::LevelFilter;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化失败时的错误信息
    init_error: Option<String>,
    /// 当前配置
    current_config: Option<LogConfig>,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径（可选）
    pub file_path: Option<PathBuf>,
    /// 是否输出到控制台
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
    /// 模块级别日志控制
    pub module_levels: HashMap<String, LevelFilter>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
            module_levels: HashMap::new(),
        }
    }
}

/// 日志系统管理器
#[derive(Debug)]
pub struct LoggingSystem {
    /// 配置
    config: LogConfig,
}

impl LoggingSystem {
    /// 创建日志系统实例，不安装全局 subscriber
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    /// 初始化日志系统
    ///
    /// # 参数
    /// * `config` - 日志配置
    ///
    /// # 返回
    /// * `Result<LoggingSystem, anyhow::Error>` - 初始化结果
    ///
    /// 重复调用不会重复安装全局 subscriber，只返回新的实例。
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        let state_mutex = GLOBAL_LOGGING_STATE.get_or_init(|| Mutex::new(GlobalLoggingState::default()));

        {
            let state = state_mutex.lock();
            if state.initialized {
                if let Some(e) = &state.init_error {
                    return Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e));
                }
                return Ok(Self::new(config));
            }
        }

        let init_result = Self::perform_initialization(&config);

        {
            let mut state = state_mutex.lock();
            state.initialized = true;
            state.current_config = Some(config.clone());
            state.init_error = init_result.as_ref().err().map(|e| e.to_string());
        }

        init_result?;
        Ok(Self::new(config))
    }

    /// 执行实际的日志系统初始化
    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        // 初始化 LogTracer（log crate 到 tracing 的桥接）
        Self::init_log_tracer()?;

        // 初始化 tracing subscriber
        Self::init_tracing_subscriber(config)?;

        Ok(())
    }

    /// 初始化 LogTracer
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        let result = LOG_TRACER_INIT.get_or_init(|| LogTracer::init().map_err(|e| e.to_string()));

        result
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let mut env_filter = EnvFilter::from_default_env().add_directive(Self::level_directive(config.level));

        // 添加模块级别过滤
        for (module, level) in &config.module_levels {
            let directive: Directive = format!("{}={}", module, Self::level_to_string(*level))
                .parse()
                .map_err(|e| anyhow::anyhow!("无效的模块日志级别 {}: {}", module, e))?;
            env_filter = env_filter.add_directive(directive);
        }

        let fmt_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            fmt::layer()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_target(true)
                .with_thread_names(true)
                .boxed()
        };

        let result = if !config.console {
            match &config.file_path {
                Some(file_path) => {
                    let file = std::fs::File::create(file_path)
                        .map_err(|e| anyhow::anyhow!("创建日志文件失败: {}", e))?;
                    let file_layer = fmt::layer()
                        .with_writer(file)
                        .with_ansi(false)
                        .with_file(true)
                        .with_line_number(true);
                    registry().with(env_filter).with(file_layer).try_init()
                }
                None => registry().with(env_filter).with(fmt_layer).try_init(),
            }
        } else {
            registry().with(env_filter).with(fmt_layer).try_init()
        };

        match result {
            Ok(()) => {
                tracing::info!("日志系统初始化完成");
                tracing::debug!("日志配置: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("already been set") || error_msg.contains("already initialized") {
                    // 其他地方（如测试框架）已经安装了全局 subscriber
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("tracing subscriber初始化失败: {}", error_msg))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn level_directive(level: LevelFilter) -> Directive {
        let level = match level {
            LevelFilter::Off => TracingLevel::OFF,
            LevelFilter::Error => TracingLevel::ERROR,
            LevelFilter::Warn => TracingLevel::WARN,
            LevelFilter::Info => TracingLevel::INFO,
            LevelFilter::Debug => TracingLevel::DEBUG,
            LevelFilter::Trace => TracingLevel::TRACE,
        };
        Directive::from(level)
    }

    /// 将 log::LevelFilter 转换为字符串
    fn level_to_string(level: LevelFilter) -> &'static str {
        match level {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        }
    }

    /// 检查日志系统是否已初始化
    pub fn is_initialized() -> bool {
        GLOBAL_LOGGING_STATE
            .get()
            .map(|state| state.lock().initialized)
            .unwrap_or(false)
    }

    /// 获取当前日志配置（如果已初始化）
    pub fn current_config() -> Option<LogConfig> {
        GLOBAL_LOGGING_STATE
            .get()
            .and_then(|state| state.lock().current_config.clone())
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state_mutex) = GLOBAL_LOGGING_STATE.get() {
            let mut state = state_mutex.lock();
            state.initialized = false;
            state.init_error = None;
            state.current_config = None;
        }
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// 记录配置重载日志
    pub fn reload_log(&self, config_name: &str, success: bool, details: Option<&str>) {
        if self.config.json_format {
            let entry = json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "type": "config_reload",
                "config": config_name,
                "success": success,
                "details": details.unwrap_or(""),
            });
            tracing::info!("{entry}");
        } else {
            tracing::info!(
                "RELOAD: {} - {} {}",
                config_name,
                if success { "SUCCESS" } else { "FAILED" },
                details.unwrap_or("")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    /// 创建测试用的日志配置
    fn create_test_config() -> LogConfig {
        LogConfig {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
            module_levels: HashMap::new(),
        }
    }

    #[test]
    #[serial]
    fn test_logging_system_single_initialization() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();

        // 第一次初始化应该成功
        let result1 = LoggingSystem::setup_logging(config.clone());
        assert!(result1.is_ok());
        assert!(LoggingSystem::is_initialized());

        // 第二次初始化不会重复安装 subscriber
        let result2 = LoggingSystem::setup_logging(config);
        assert!(result2.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_file_output() {
        LoggingSystem::reset_for_testing();

        let temp_file = NamedTempFile::new().unwrap();
        let mut config = create_test_config();
        config.file_path = Some(temp_file.path().to_path_buf());
        config.console = false;

        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_json_format() {
        LoggingSystem::reset_for_testing();

        let mut config = create_test_config();
        config.json_format = true;

        let system = LoggingSystem::setup_logging(config).unwrap();
        assert!(system.config().json_format);
        system.reload_log("server", false, Some("port: invalid type"));
    }

    #[test]
    #[serial]
    fn test_current_config_retrieval() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();
        let _system = LoggingSystem::setup_logging(config.clone()).unwrap();

        let retrieved_config = LoggingSystem::current_config().unwrap();
        assert_eq!(retrieved_config.level, config.level);
        assert_eq!(retrieved_config.console, config.console);
        assert_eq!(retrieved_config.json_format, config.json_format);
    }

    #[test]
    #[serial]
    fn test_module_level_filtering() {
        LoggingSystem::reset_for_testing();

        let mut config = create_test_config();
        config.module_levels.insert("confhub::config".to_string(), LevelFilter::Debug);
        config.module_levels.insert("notify".to_string(), LevelFilter::Warn);

        assert!(LoggingSystem::setup_logging(config).is_ok());
    }
}
